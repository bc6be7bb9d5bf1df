//! Merchant Stats Cache (C8): bounded-staleness cache keyed by
//! `merchant_id`, with single-flight coalescing on misses (§4.8).

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::error::{AppError, AppResult};
use crate::history::HistoryStore;
use crate::models::MerchantStats;

/// Wraps a `moka` cache whose `get_with` already provides single-flight
/// coalescing: concurrent misses for the same key share one `HistoryStore`
/// call rather than issuing one each.
#[derive(Clone)]
pub struct MerchantStatsCache {
    cache: Cache<String, MerchantStats>,
    history: Arc<dyn HistoryStore>,
}

impl MerchantStatsCache {
    pub fn new(history: Arc<dyn HistoryStore>, capacity: u64, ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        MerchantStatsCache { cache, history }
    }

    pub async fn get(&self, merchant_id: &str) -> AppResult<MerchantStats> {
        let history = self.history.clone();
        let key = merchant_id.to_string();
        self.cache
            .try_get_with(key, async move { history.get_merchant_stats(merchant_id).await })
            .await
            .map_err(|e| AppError::StorageUnavailable(anyhow::anyhow!(e)))
    }

    pub fn invalidate(&self, merchant_id: &str) {
        self.cache.invalidate(merchant_id);
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
