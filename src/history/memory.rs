use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::{Alert, FeatureVector, HistoryRecord, MerchantStats, ScoreResult, Transaction};

use super::HistoryStore;

struct StoredRecord {
    transaction: Transaction,
    #[allow(dead_code)]
    features: FeatureVector,
    #[allow(dead_code)]
    score: ScoreResult,
}

/// In-memory `HistoryStore` used by tests and `POST /simulate` fixtures —
/// no network, deterministic, lets P4/P9 be asserted without a live
/// Postgres instance.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    transactions: Mutex<HashMap<String, StoredRecord>>,
    alerts: Mutex<HashMap<String, Alert>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        InMemoryHistoryStore {
            transactions: Mutex::new(HashMap::new()),
            alerts: Mutex::new(HashMap::new()),
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn store(
        &self,
        transaction: &Transaction,
        features: &FeatureVector,
        score: &ScoreResult,
    ) -> AppResult<()> {
        let mut txns = self.transactions.lock().unwrap();
        txns.entry(transaction.txn_id.clone()).or_insert_with(|| StoredRecord {
            transaction: transaction.clone(),
            features: features.clone(),
            score: score.clone(),
        });
        Ok(())
    }

    async fn store_alert(&self, alert: &Alert) -> AppResult<()> {
        let mut alerts = self.alerts.lock().unwrap();
        alerts.entry(alert.alert_id.clone()).or_insert_with(|| alert.clone());
        Ok(())
    }

    async fn get_customer_history(
        &self,
        customer_id: &str,
        hours: i64,
    ) -> AppResult<Vec<HistoryRecord>> {
        let since = Utc::now() - chrono::Duration::hours(hours);
        let txns = self.transactions.lock().unwrap();
        let mut history: Vec<HistoryRecord> = txns
            .values()
            .map(|r| &r.transaction)
            .filter(|t| t.customer_id == customer_id && t.ts >= since)
            .map(|t| HistoryRecord {
                ts: t.ts,
                amount: t.amount,
                merchant_id: t.merchant_id.clone(),
                country: t.country.clone(),
                city: t.city.clone(),
                lat: t.lat,
                lon: t.lon,
                device_id: t.device_id.clone(),
                ip: t.ip.clone(),
            })
            .collect();
        history.sort_by(|a, b| b.ts.cmp(&a.ts));
        Ok(history)
    }

    async fn get_merchant_stats(&self, merchant_id: &str) -> AppResult<MerchantStats> {
        let txns = self.transactions.lock().unwrap();
        let matching: Vec<&Transaction> = txns
            .values()
            .map(|r| &r.transaction)
            .filter(|t| t.merchant_id == merchant_id)
            .collect();
        if matching.is_empty() {
            return Ok(MerchantStats::zero());
        }
        let total = matching.len() as i64;
        let sum: f64 = matching.iter().map(|t| t.amount_f64()).sum();
        let fraud_count = matching.iter().filter(|t| t.is_fraud == Some(true)).count() as i64;
        Ok(MerchantStats {
            total_transactions: total,
            avg_amount: sum / total as f64,
            fraud_count,
            fraud_rate: fraud_count as f64 / total as f64,
        })
    }

    async fn get_alerts(&self, since: DateTime<Utc>, limit: i64, offset: i64) -> AppResult<Vec<Alert>> {
        let alerts = self.alerts.lock().unwrap();
        let mut matching: Vec<Alert> = alerts
            .values()
            .filter(|a| a.timestamp >= since)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_alert(&self, alert_id: &str) -> AppResult<Option<Alert>> {
        Ok(self.alerts.lock().unwrap().get(alert_id).cloned())
    }

    async fn get_alert_count(&self, since: DateTime<Utc>) -> AppResult<i64> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.timestamp >= since)
            .count() as i64)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
