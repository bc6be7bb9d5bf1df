use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as RdConsumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};

use crate::error::{AppError, AppResult};
use crate::models::{Alert, Transaction};

use super::consumer::{CommitToken, InboundRecord};
use super::{Consumer, Publisher};

/// `rdkafka`-backed publisher. The original Python service used
/// `kafka-python` against the same bootstrap-servers contract; `rdkafka` is
/// its idiomatic async counterpart in this stack.
pub struct KafkaPublisher {
    producer: FutureProducer,
    transactions_topic: String,
    alerts_topic: String,
}

impl KafkaPublisher {
    pub fn new(bootstrap_servers: &str, transactions_topic: &str, alerts_topic: &str) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "10000")
            .create()?;
        Ok(KafkaPublisher {
            producer,
            transactions_topic: transactions_topic.to_string(),
            alerts_topic: alerts_topic.to_string(),
        })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish_transaction(&self, transaction: &Transaction) -> AppResult<()> {
        let payload = serde_json::to_vec(transaction)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        let record = FutureRecord::to(&self.transactions_topic)
            .payload(&payload)
            .key(&transaction.card_id);
        self.producer
            .send(record, Duration::from_secs(10))
            .await
            .map_err(|(e, _)| AppError::BusUnavailable(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn publish_alert(&self, alert: &Alert) -> AppResult<()> {
        let payload =
            serde_json::to_vec(alert).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        let record = FutureRecord::to(&self.alerts_topic).payload(&payload).key(&alert.txn_id);
        self.producer
            .send(record, Duration::from_secs(10))
            .await
            .map_err(|(e, _)| AppError::BusUnavailable(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.producer
            .client()
            .fetch_metadata(None, Duration::from_secs(5))
            .map_err(|e| AppError::BusUnavailable(anyhow::anyhow!(e)))?;
        Ok(true)
    }
}

/// `rdkafka` consumer group reader for `transactions.raw`. Offsets are
/// stored (not auto-committed) so the stream processor controls exactly
/// when a record is considered durably processed (§4.6).
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaConsumer {
    pub fn new(bootstrap_servers: &str, group_id: &str, topic: &str) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        RdConsumer::subscribe(&consumer, &[topic])?;
        Ok(KafkaConsumer { consumer, topic: topic.to_string() })
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    async fn recv(&self) -> AppResult<Option<InboundRecord>> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| AppError::BusUnavailable(anyhow::anyhow!(e)))?;
        let payload = message
            .payload()
            .ok_or_else(|| AppError::Validation("empty message payload".to_string()))?;
        let transaction: Transaction = serde_json::from_slice(payload)
            .map_err(|e| AppError::Validation(format!("malformed transaction payload: {e}")))?;
        Ok(Some(InboundRecord {
            transaction,
            token: CommitToken::Kafka { partition: message.partition(), offset: message.offset() },
        }))
    }

    async fn commit(&self, record: &InboundRecord) -> AppResult<()> {
        if let CommitToken::Kafka { partition, offset } = record.token {
            self.consumer
                .store_offset(&self.topic, partition, offset)
                .map_err(|e| AppError::BusUnavailable(anyhow::anyhow!(e)))?;
        }
        Ok(())
    }
}
