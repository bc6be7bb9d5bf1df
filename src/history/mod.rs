//! History Store (C1): owns all persistent state — transactions, features,
//! scores, and alerts — plus merchant aggregate statistics.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::{Alert, FeatureVector, HistoryRecord, MerchantStats, ScoreResult, Transaction};

pub use memory::InMemoryHistoryStore;
pub use postgres::PostgresHistoryStore;

/// Abstract persistence boundary the stream processor and request path
/// depend on, never on a concrete Postgres type (§9 "cyclic module
/// coupling" fix).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Upserts by `txn_id` across the transactions/features/scores
    /// relations, atomically. Idempotent: a repeated `txn_id` is a no-op.
    async fn store(
        &self,
        transaction: &Transaction,
        features: &FeatureVector,
        score: &ScoreResult,
    ) -> AppResult<()>;

    /// Upserts by `alert_id`, idempotent, in a separate atomic unit from
    /// `store` (§4.1: a crash between the two may leave a scored
    /// transaction without its alert).
    async fn store_alert(&self, alert: &Alert) -> AppResult<()>;

    /// Prior transactions for `customer_id` within the last `hours`,
    /// descending by `ts`.
    async fn get_customer_history(
        &self,
        customer_id: &str,
        hours: i64,
    ) -> AppResult<Vec<HistoryRecord>>;

    /// Aggregate stats for `merchant_id`; zeros when no rows exist.
    async fn get_merchant_stats(&self, merchant_id: &str) -> AppResult<MerchantStats>;

    async fn get_alerts(&self, since: DateTime<Utc>, limit: i64, offset: i64) -> AppResult<Vec<Alert>>;

    async fn get_alert(&self, alert_id: &str) -> AppResult<Option<Alert>>;

    async fn get_alert_count(&self, since: DateTime<Utc>) -> AppResult<i64>;

    async fn health_check(&self) -> AppResult<bool>;
}
