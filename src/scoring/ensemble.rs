//! Ensemble & Threshold (C5): combines the two sub-scores with fixed
//! weights and emits the alert decision plus explanation payload (§4.5).

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::ScoringConfig;
use crate::error::AppError;
use crate::models::{
    Explanation, FeatureContribution, FeatureVector, RiskFactors, ScoreResult,
};

use super::autoencoder::{Autoencoder, Scaler};
use super::isolation_forest::IsolationForest;
use super::synthetic::generate_synthetic_data;

const SYNTHETIC_TRAINING_SAMPLES: usize = 10_000;

/// Abstraction the pipeline depends on instead of a concrete model type
/// (§9 "cyclic module coupling" fix). Inference is pure CPU-bound math with
/// no suspension points (§5), so this trait is synchronous.
pub trait Scorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> ScoreResult;
}

pub struct EnsembleScorer {
    isolation_forest: IsolationForest,
    autoencoder: Autoencoder,
    scaler: Scaler,
    threshold: f64,
    isolation_forest_weight: f64,
    autoencoder_weight: f64,
}

impl EnsembleScorer {
    /// Loads `isolation_forest.bin`, `autoencoder.bin`, `scaler.bin` from
    /// `config.model_artifact_dir`. Any missing artifact triggers a full
    /// retrain against the seed-42 synthetic dataset and the result is
    /// persisted so the next startup loads instead of retraining (§6) —
    /// unless `config.training_enabled` is false, in which case missing
    /// artifacts are startup-fatal.
    pub fn load_or_train(config: &ScoringConfig) -> anyhow::Result<Self> {
        let dir = Path::new(&config.model_artifact_dir);
        fs::create_dir_all(dir).context("creating model artifact directory")?;

        let forest_path = dir.join("isolation_forest.bin");
        let autoencoder_path = dir.join("autoencoder.bin");
        let scaler_path = dir.join("scaler.bin");
        let artifacts_present = forest_path.exists() && autoencoder_path.exists() && scaler_path.exists();

        if !artifacts_present && !config.training_enabled {
            return Err(AppError::ModelUnavailable(format!(
                "model artifacts absent in {} and training is disabled",
                dir.display()
            ))
            .into());
        }

        let (isolation_forest, autoencoder, scaler) =
            if artifacts_present {
                tracing::info!(dir = %dir.display(), "loading existing model artifacts");
                let forest: IsolationForest = bincode::deserialize(&fs::read(&forest_path)?)
                    .context("deserializing isolation_forest.bin")?;
                let autoencoder: Autoencoder = bincode::deserialize(&fs::read(&autoencoder_path)?)
                    .context("deserializing autoencoder.bin")?;
                let scaler: Scaler = bincode::deserialize(&fs::read(&scaler_path)?)
                    .context("deserializing scaler.bin")?;
                (forest, autoencoder, scaler)
            } else {
                tracing::info!("model artifacts absent, training from synthetic seed-42 data");
                let raw = generate_synthetic_data(SYNTHETIC_TRAINING_SAMPLES);
                let forest = IsolationForest::train(&raw);
                let scaler = Scaler::fit(&raw);
                let scaled: Vec<_> = raw.iter().map(|r| scaler.transform(r)).collect();
                let autoencoder = Autoencoder::train(&scaled);

                fs::write(&forest_path, bincode::serialize(&forest)?)
                    .context("writing isolation_forest.bin")?;
                fs::write(&autoencoder_path, bincode::serialize(&autoencoder)?)
                    .context("writing autoencoder.bin")?;
                fs::write(&scaler_path, bincode::serialize(&scaler)?).context("writing scaler.bin")?;
                tracing::info!(dir = %dir.display(), "trained and persisted model artifacts");

                (forest, autoencoder, scaler)
            };

        Ok(EnsembleScorer {
            isolation_forest,
            autoencoder,
            scaler,
            threshold: config.threshold,
            isolation_forest_weight: config.isolation_forest_weight,
            autoencoder_weight: config.autoencoder_weight,
        })
    }
}

impl Scorer for EnsembleScorer {
    fn score(&self, features: &FeatureVector) -> ScoreResult {
        let array = features.to_array();
        let if_score = self.isolation_forest.score(&array);
        let scaled = self.scaler.transform(&array);
        let ae_score = self.autoencoder.score(&scaled);

        let ensemble_score = self.isolation_forest_weight * if_score + self.autoencoder_weight * ae_score;
        let is_alert = ensemble_score > self.threshold;
        let confidence = (ensemble_score * 1.2).min(1.0);

        ScoreResult {
            score: ensemble_score,
            threshold: self.threshold,
            is_alert,
            model_used: "ensemble".to_string(),
            confidence,
            explanation: build_explanation(features, ensemble_score, if_score, ae_score),
        }
    }
}

fn build_explanation(features: &FeatureVector, ensemble_score: f64, if_score: f64, ae_score: f64) -> Explanation {
    let mut contributions = vec![
        FeatureContribution { feature: "amount_z_score".into(), contribution: features.amount_z_score.abs() },
        FeatureContribution { feature: "txn_count_1h".into(), contribution: features.txn_count_1h / 10.0 },
        FeatureContribution { feature: "distance_from_home".into(), contribution: features.distance_from_home / 100.0 },
        FeatureContribution { feature: "merchant_fraud_rate".into(), contribution: features.merchant_fraud_rate },
        FeatureContribution { feature: "device_rarity_score".into(), contribution: features.device_rarity_score },
        FeatureContribution {
            feature: "country_change".into(),
            contribution: if features.country_change { 1.0 } else { 0.0 },
        },
    ];
    contributions.sort_by(|a, b| b.contribution.partial_cmp(&a.contribution).unwrap());
    contributions.truncate(3);

    let risk_factors = RiskFactors {
        high_amount: features.amount_z_score > 2.0,
        high_velocity: features.txn_count_1h > 5.0,
        geographic_anomaly: features.country_change,
        suspicious_merchant: features.merchant_fraud_rate > 0.1,
        device_anomaly: features.device_rarity_score > 0.8,
    };

    let mut counterfactuals = Vec::new();
    if features.amount_z_score > 2.0 {
        counterfactuals.push("Reduce transaction amount".to_string());
    }
    if features.txn_count_1h > 5.0 {
        counterfactuals.push("Reduce transaction frequency".to_string());
    }
    if features.country_change {
        counterfactuals.push("Use card in home country".to_string());
    }

    Explanation {
        ensemble_score,
        isolation_forest_score: if_score,
        autoencoder_score: ae_score,
        top_contributing_features: contributions,
        risk_factors,
        counterfactuals,
    }
}
