//! Shared orchestration invoked by both the stream processor (C6) and the
//! synchronous request path (C7): validate, featurize, score, persist, and
//! optionally raise an alert. Bus publication is left to the caller since
//! C6 and C7 have different publish/commit disposition rules (§4.6, §4.7).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::features::FeatureEngineer;
use crate::history::HistoryStore;
use crate::models::{Alert, FeatureVector, ScoreResult, Transaction};
use crate::scoring::Scorer;

pub struct Pipeline {
    history: Arc<dyn HistoryStore>,
    features: Arc<FeatureEngineer>,
    scorer: Arc<dyn Scorer>,
}

pub struct PipelineOutcome {
    pub transaction: Transaction,
    pub features: FeatureVector,
    pub score: ScoreResult,
    pub alert: Option<Alert>,
}

impl Pipeline {
    pub fn new(history: Arc<dyn HistoryStore>, features: Arc<FeatureEngineer>, scorer: Arc<dyn Scorer>) -> Self {
        Pipeline { history, features, scorer }
    }

    /// Runs the pipeline under `deadline`; a timeout aborts without
    /// committing any side effect beyond what already completed atomically
    /// (§5).
    pub async fn run(&self, transaction: Transaction, deadline: Duration) -> AppResult<PipelineOutcome> {
        tokio::time::timeout(deadline, self.run_inner(transaction))
            .await
            .map_err(|_| AppError::Timeout(deadline))?
    }

    async fn run_inner(&self, transaction: Transaction) -> AppResult<PipelineOutcome> {
        transaction
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let features = self.features.compute(&transaction).await;
        let score = self.score_with_fallback(&features);

        self.history.store(&transaction, &features, &score).await?;

        let alert = if score.is_alert {
            let alert = Alert::new(Uuid::new_v4().to_string(), transaction.txn_id.clone(), score.score, score.explanation.clone());
            self.history.store_alert(&alert).await?;
            Some(alert)
        } else {
            None
        };

        Ok(PipelineOutcome { transaction, features, score, alert })
    }

    /// §7 `ScoringFailed`: numeric error, NaN, or a panic inside the scorer
    /// never blocks ingestion — substitute the fallback result and log.
    fn score_with_fallback(&self, features: &FeatureVector) -> ScoreResult {
        let scorer = &self.scorer;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| scorer.score(features)));
        match result {
            Ok(score) if score.score.is_finite() && (0.0..=1.0).contains(&score.score) => score,
            Ok(score) => {
                tracing::warn!(score = score.score, "scorer produced an out-of-range score, using fallback");
                ScoreResult::fallback(score.threshold)
            }
            Err(_) => {
                tracing::error!("scorer panicked, using fallback score");
                ScoreResult::fallback(0.95)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::cache::MerchantStatsCache;
    use crate::features::FeatureEngineer;
    use crate::history::InMemoryHistoryStore;
    use crate::models::{Channel, FeatureVector};

    fn sample_transaction() -> Transaction {
        Transaction {
            txn_id: "txn_1".into(),
            ts: chrono::Utc::now(),
            amount: Decimal::from_str("42.00").unwrap(),
            currency: "USD".into(),
            merchant_id: "m_1".into(),
            merchant_cat: "retail".into(),
            mcc: "5411".into(),
            country: "US".into(),
            city: "NY".into(),
            lat: None,
            lon: None,
            channel: Channel::Web,
            card_id: "card_1".into(),
            customer_id: "cust_1".into(),
            device_id: None,
            ip: None,
            is_fraud: None,
        }
    }

    struct FixedScorer {
        result: ScoreResult,
    }

    impl Scorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> ScoreResult {
            self.result.clone()
        }
    }

    fn pipeline_with(scorer: ScoreResult) -> (Pipeline, Arc<InMemoryHistoryStore>) {
        let history = Arc::new(InMemoryHistoryStore::new());
        let cache = MerchantStatsCache::new(history.clone(), 1_000, 60);
        let features = Arc::new(FeatureEngineer::new(history.clone(), cache));
        let pipeline = Pipeline::new(history.clone(), features, Arc::new(FixedScorer { result: scorer }));
        (pipeline, history)
    }

    #[tokio::test]
    async fn stores_transaction_even_when_not_alerting() {
        let (pipeline, history) = pipeline_with(ScoreResult::fallback(0.95));
        let outcome = pipeline.run(sample_transaction(), Duration::from_secs(2)).await.unwrap();
        assert!(outcome.alert.is_none());
        assert_eq!(history.transaction_count(), 1);
        assert_eq!(history.alert_count(), 0);
    }

    #[tokio::test]
    async fn raises_and_persists_an_alert_above_threshold() {
        let mut score = ScoreResult::fallback(0.95);
        score.score = 0.99;
        score.is_alert = true;
        let (pipeline, history) = pipeline_with(score);
        let outcome = pipeline.run(sample_transaction(), Duration::from_secs(2)).await.unwrap();
        assert!(outcome.alert.is_some());
        assert_eq!(history.alert_count(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_transactions_before_scoring() {
        let (pipeline, history) = pipeline_with(ScoreResult::fallback(0.95));
        let mut txn = sample_transaction();
        txn.amount = Decimal::ZERO;
        let result = pipeline.run(txn, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(history.transaction_count(), 0);
    }

    #[tokio::test]
    async fn substitutes_fallback_when_scorer_returns_nan() {
        let mut bad = ScoreResult::fallback(0.95);
        bad.score = f64::NAN;
        let (pipeline, _history) = pipeline_with(bad);
        let outcome = pipeline.run(sample_transaction(), Duration::from_secs(2)).await.unwrap();
        assert!(outcome.score.score.is_finite());
    }
}
