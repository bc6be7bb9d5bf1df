use serde::{Deserialize, Serialize};

/// Ranked feature contribution entry used in `top_contributing_features`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub contribution: f64,
}

/// Boolean risk signals derived from the feature vector (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub high_amount: bool,
    pub high_velocity: bool,
    pub geographic_anomaly: bool,
    pub suspicious_merchant: bool,
    pub device_anomaly: bool,
}

/// The payload handed back to external UIs alongside a `ScoreResult` (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub ensemble_score: f64,
    pub isolation_forest_score: f64,
    pub autoencoder_score: f64,
    pub top_contributing_features: Vec<FeatureContribution>,
    pub risk_factors: RiskFactors,
    pub counterfactuals: Vec<String>,
}

/// Result of running the ensemble on one feature vector (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub threshold: f64,
    pub is_alert: bool,
    pub model_used: String,
    pub confidence: f64,
    pub explanation: Explanation,
}

impl ScoreResult {
    /// The degraded result substituted when scoring itself fails (§7,
    /// `ScoringFailed`). Ingestion must never block on a numeric error.
    pub fn fallback(threshold: f64) -> Self {
        ScoreResult {
            score: 0.5,
            threshold,
            is_alert: false,
            model_used: "fallback".to_string(),
            confidence: 0.0,
            explanation: Explanation {
                ensemble_score: 0.5,
                isolation_forest_score: 0.5,
                autoencoder_score: 0.5,
                top_contributing_features: Vec::new(),
                risk_factors: RiskFactors {
                    high_amount: false,
                    high_velocity: false,
                    geographic_anomaly: false,
                    suspicious_merchant: false,
                    device_anomaly: false,
                },
                counterfactuals: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_never_an_alert() {
        let r = ScoreResult::fallback(0.95);
        assert!(!r.is_alert);
        assert_eq!(r.model_used, "fallback");
        assert_eq!(r.score, 0.5);
    }
}
