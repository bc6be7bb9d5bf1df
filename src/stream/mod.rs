//! Stream Processor (C6): consumes `transactions.raw` and drives each
//! record through the shared pipeline, committing only after persistence
//! (and, when raised, the alert publish) has succeeded (§4.6).

use std::sync::Arc;
use std::time::Duration;

use crate::bus::{Consumer, InboundRecord, Publisher};
use crate::error::{AppError, StreamDisposition};
use crate::pipeline::Pipeline;

/// Per-record transitions, logged at each step. `Failed` is absorbing: the
/// record is not committed and is left for re-delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Received,
    Featurized,
    Scored,
    Persisted,
    Alerted,
    Committed,
    Failed,
}

pub struct StreamProcessor {
    consumer: Arc<dyn Consumer>,
    publisher: Arc<dyn Publisher>,
    pipeline: Arc<Pipeline>,
    deadline: Duration,
}

impl StreamProcessor {
    pub fn new(consumer: Arc<dyn Consumer>, publisher: Arc<dyn Publisher>, pipeline: Arc<Pipeline>, deadline: Duration) -> Self {
        StreamProcessor { consumer, publisher, pipeline, deadline }
    }

    /// Runs until the consumer reports the stream closed. Each record is
    /// processed to completion (or `Failed`) before the next is pulled,
    /// preserving per-`txn_id` serialization (§5).
    pub async fn run(&self) {
        loop {
            match self.consumer.recv().await {
                Ok(Some(record)) => self.process_one(record).await,
                Ok(None) => {
                    tracing::info!("stream closed, stopping processor");
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to receive from transactions.raw, retrying");
                }
            }
        }
    }

    async fn process_one(&self, record: InboundRecord) {
        let txn_id = record.transaction.txn_id.clone();
        let token = record.token;

        tracing::debug!(txn_id = %txn_id, state = ?State::Received, "record received");

        let outcome = match self.pipeline.run(record.transaction, self.deadline).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.log_failure(&txn_id, State::Failed, &e);
                return;
            }
        };
        tracing::debug!(txn_id = %txn_id, state = ?State::Featurized, "feature vector computed");
        tracing::debug!(txn_id = %txn_id, state = ?State::Scored, score = outcome.score.score, "scored");
        tracing::debug!(txn_id = %txn_id, state = ?State::Persisted, "transaction, features, and score persisted");

        if let Some(alert) = &outcome.alert {
            if let Err(e) = self.publisher.publish_alert(alert).await {
                self.log_failure(&txn_id, State::Failed, &e);
                return;
            }
            tracing::info!(txn_id = %txn_id, alert_id = %alert.alert_id, state = ?State::Alerted, "alert raised and published");
        }

        let committed = InboundRecord { transaction: outcome.transaction, token };
        if let Err(e) = self.consumer.commit(&committed).await {
            self.log_failure(&txn_id, State::Failed, &e);
            return;
        }
        tracing::debug!(txn_id = %txn_id, state = ?State::Committed, "offset committed");
    }

    fn log_failure(&self, txn_id: &str, state: State, error: &AppError) {
        match error.stream_disposition() {
            StreamDisposition::DropAndLog => {
                tracing::warn!(txn_id = %txn_id, ?state, error = %error, "dropping record");
            }
            StreamDisposition::Redeliver => {
                tracing::error!(txn_id = %txn_id, ?state, error = %error, "leaving record for re-delivery");
            }
            StreamDisposition::Continue => {
                tracing::warn!(txn_id = %txn_id, ?state, error = %error, "continuing with degraded result");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::bus::{InMemoryConsumer, InMemoryPublisher};
    use crate::cache::MerchantStatsCache;
    use crate::features::FeatureEngineer;
    use crate::history::InMemoryHistoryStore;
    use crate::models::{Channel, FeatureVector, ScoreResult};
    use crate::scoring::Scorer;

    fn sample_transaction(txn_id: &str) -> crate::models::Transaction {
        crate::models::Transaction {
            txn_id: txn_id.to_string(),
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

    struct FixedScorer(ScoreResult);

    impl Scorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> ScoreResult {
            self.0.clone()
        }
    }

    fn processor_with(
        scorer: ScoreResult,
        transactions: Vec<crate::models::Transaction>,
    ) -> (StreamProcessor, Arc<InMemoryHistoryStore>, Arc<InMemoryPublisher>, Arc<InMemoryConsumer>) {
        let history = Arc::new(InMemoryHistoryStore::new());
        let cache = MerchantStatsCache::new(history.clone(), 1_000, 60);
        let features = Arc::new(FeatureEngineer::new(history.clone(), cache));
        let pipeline = Arc::new(Pipeline::new(history.clone(), features, Arc::new(FixedScorer(scorer))));
        let publisher = Arc::new(InMemoryPublisher::new());
        let consumer = Arc::new(InMemoryConsumer::new(transactions));
        let processor = StreamProcessor::new(consumer.clone(), publisher.clone(), pipeline, Duration::from_secs(10));
        (processor, history, publisher, consumer)
    }

    #[tokio::test]
    async fn commits_after_persisting_a_non_alerting_record() {
        let (processor, history, publisher, consumer) =
            processor_with(ScoreResult::fallback(0.95), vec![sample_transaction("txn_1")]);
        processor.run().await;
        assert_eq!(history.transaction_count(), 1);
        assert_eq!(publisher.published_alert_count(), 0);
        assert_eq!(consumer.committed_count(), 1);
    }

    #[tokio::test]
    async fn publishes_and_commits_an_alerting_record() {
        let mut score = ScoreResult::fallback(0.95);
        score.score = 0.99;
        score.is_alert = true;
        let (processor, history, publisher, consumer) = processor_with(score, vec![sample_transaction("txn_2")]);
        processor.run().await;
        assert_eq!(history.alert_count(), 1);
        assert_eq!(publisher.published_alert_count(), 1);
        assert_eq!(consumer.committed_count(), 1);
    }

    #[tokio::test]
    async fn invalid_record_is_dropped_without_commit() {
        let mut txn = sample_transaction("txn_3");
        txn.amount = Decimal::ZERO;
        let (processor, history, _publisher, consumer) = processor_with(ScoreResult::fallback(0.95), vec![txn]);
        processor.run().await;
        assert_eq!(history.transaction_count(), 0);
        assert_eq!(consumer.committed_count(), 0);
    }
}
