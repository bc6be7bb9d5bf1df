//! Downstream event bus: `transactions.raw` and `alerts.suspicious`
//! topics, at-least-once in both directions (§6).

pub mod consumer;
pub mod kafka;
pub mod memory;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Alert, Transaction};

pub use consumer::InboundRecord;
pub use kafka::{KafkaConsumer, KafkaPublisher};
pub use memory::{InMemoryConsumer, InMemoryPublisher};

/// Abstract publish boundary the stream processor and request path depend
/// on, never on a concrete Kafka type (§9).
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes to `transactions.raw`, keyed by `card_id` so a card's
    /// events land on the same partition (§6).
    async fn publish_transaction(&self, transaction: &Transaction) -> AppResult<()>;

    /// Publishes to `alerts.suspicious`, keyed by `txn_id`.
    async fn publish_alert(&self, alert: &Alert) -> AppResult<()>;

    async fn health_check(&self) -> AppResult<bool>;
}

/// Abstract consume boundary the stream processor depends on instead of a
/// concrete Kafka type (§9).
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Suspends until the next record on `transactions.raw` is available.
    /// `Ok(None)` means the stream has been closed.
    async fn recv(&self) -> AppResult<Option<InboundRecord>>;

    /// Acknowledges `record`, advancing the committed offset so it is not
    /// re-delivered. Called only after the record has been durably
    /// persisted (§4.6).
    async fn commit(&self, record: &InboundRecord) -> AppResult<()>;
}
