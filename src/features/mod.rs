//! Feature Engineer (C2): derives the canonical 34-field `FeatureVector`
//! from a transaction plus its customer history and merchant stats (§4.2).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Timelike};

use crate::cache::MerchantStatsCache;
use crate::history::HistoryStore;
use crate::models::{Channel, FeatureVector, HistoryRecord, MerchantStats, Transaction};
use crate::utils::geo::{distance_km, Coordinate};
use crate::utils::hash::encode_categorical;

pub struct FeatureEngineer {
    history: Arc<dyn HistoryStore>,
    merchant_cache: MerchantStatsCache,
}

impl FeatureEngineer {
    pub fn new(history: Arc<dyn HistoryStore>, merchant_cache: MerchantStatsCache) -> Self {
        FeatureEngineer { history, merchant_cache }
    }

    /// Computes the feature vector for `txn`. Per §4.2, any sub-computation
    /// failure degrades to the default vector rather than failing the
    /// enclosing scoring call — only the history/merchant-stats fetches can
    /// realistically fail (storage outage), so that's the only fallible
    /// boundary here; everything downstream of a successful fetch is pure
    /// arithmetic that cannot fail given validated input.
    pub async fn compute(&self, txn: &Transaction) -> FeatureVector {
        let history = match self.history.get_customer_history(&txn.customer_id, 24).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(error = %e, txn_id = %txn.txn_id, "history fetch failed, using default feature vector");
                return default_vector(txn);
            }
        };
        let merchant_stats = match self.merchant_cache.get(&txn.merchant_id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, merchant_id = %txn.merchant_id, "merchant stats fetch failed, defaulting to zero");
                MerchantStats::zero()
            }
        };
        compute_from(txn, &history, &merchant_stats)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, matching the `numpy.std` default (ddof=0)
/// the original implementation relies on.
fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn compute_from(txn: &Transaction, history: &[HistoryRecord], stats: &MerchantStats) -> FeatureVector {
    let amount = txn.amount_f64();
    let amounts: Vec<f64> = history.iter().map(|h| h.amount_f64()).filter(|a| *a > 0.0).collect();

    let (amount_z_score, amount_rolling_mean_24h, amount_rolling_std_24h) = if amounts.is_empty() {
        (0.0, 0.0, 1.0)
    } else {
        let mean_amount = mean(&amounts);
        let std_amount = if amounts.len() > 1 { population_std(&amounts) } else { 1.0 };
        let z = if std_amount > 0.0 { (amount - mean_amount) / std_amount } else { 0.0 };
        (z, mean_amount, std_amount)
    };

    let one_hour_ago = txn.ts - chrono::Duration::hours(1);
    let recent_1h_amounts: Vec<f64> = history
        .iter()
        .filter(|h| h.ts >= one_hour_ago && h.amount_f64() > 0.0)
        .map(|h| h.amount_f64())
        .collect();
    let amount_rolling_mean_1h = if recent_1h_amounts.is_empty() { 0.0 } else { mean(&recent_1h_amounts) };
    let amount_rolling_std_1h = if recent_1h_amounts.len() > 1 { population_std(&recent_1h_amounts) } else { 1.0 };

    let five_min_ago = txn.ts - chrono::Duration::minutes(5);
    let one_day_ago = txn.ts - chrono::Duration::hours(24);
    let recent_5m: Vec<&HistoryRecord> = history.iter().filter(|h| h.ts >= five_min_ago).collect();
    let recent_1h: Vec<&HistoryRecord> = history.iter().filter(|h| h.ts >= one_hour_ago).collect();
    let recent_24h: Vec<&HistoryRecord> = history.iter().filter(|h| h.ts >= one_day_ago).collect();

    let distinct_merchants = |records: &[&HistoryRecord]| -> f64 {
        records.iter().map(|h| h.merchant_id.as_str()).collect::<HashSet<_>>().len() as f64
    };

    let (distance_from_home, speed_from_last_txn, country_change, city_change, device_change, ip_change) =
        if let Some(last) = history.first() {
            let country_change = last.country != txn.country;
            let city_change = last.city != txn.city;

            let speed = match (txn.coordinates(), last.lat, last.lon) {
                (Some((lat, lon)), Some(last_lat), Some(last_lon)) => {
                    let distance = distance_km(
                        Coordinate::new(last_lat, last_lon),
                        Coordinate::new(lat, lon),
                    );
                    let time_diff_hours = (txn.ts - last.ts).num_milliseconds() as f64 / 3_600_000.0;
                    if time_diff_hours > 0.0 {
                        Some(distance / time_diff_hours)
                    } else {
                        None
                    }
                }
                _ => None,
            };

            let device_change = match (&last.device_id, &txn.device_id) {
                (Some(a), Some(b)) => a != b,
                _ => false,
            };
            let ip_change = match (&last.ip, &txn.ip) {
                (Some(a), Some(b)) => a != b,
                _ => false,
            };

            (0.0, speed, country_change, city_change, device_change, ip_change)
        } else {
            (0.0, None, false, false, false, false)
        };

    FeatureVector {
        amount,
        amount_z_score,
        amount_log: (amount + 1.0).ln(),
        amount_rolling_mean_1h,
        amount_rolling_std_1h,
        amount_rolling_mean_24h,
        amount_rolling_std_24h,
        txn_count_5m: recent_5m.len() as f64,
        txn_count_1h: recent_1h.len() as f64,
        txn_count_24h: history.len() as f64,
        distinct_merchants_5m: distinct_merchants(&recent_5m),
        distinct_merchants_1h: distinct_merchants(&recent_1h),
        distinct_merchants_24h: distinct_merchants(&recent_24h),
        distance_from_home,
        speed_from_last_txn,
        country_change,
        city_change,
        hour_of_day: txn.ts.hour() as f64,
        day_of_week: txn.ts.weekday().num_days_from_monday() as f64,
        is_holiday: false,
        is_weekend: txn.ts.weekday().num_days_from_monday() >= 5,
        merchant_fraud_rate: stats.fraud_rate,
        mcc_fraud_rate: 0.01,
        merchant_txn_count: stats.total_transactions as f64,
        device_rarity_score: 1.0,
        ip_rarity_score: 1.0,
        device_change,
        ip_change,
        channel_card_present: channel_flag(txn.channel, Channel::CardPresent),
        channel_web: channel_flag(txn.channel, Channel::Web),
        channel_app: channel_flag(txn.channel, Channel::App),
        merchant_id_encoded: encode_categorical(&txn.merchant_id),
        mcc_encoded: encode_categorical(&txn.mcc),
        country_encoded: encode_categorical(&txn.country),
    }
}

fn channel_flag(actual: Channel, expected: Channel) -> f64 {
    if actual == expected { 1.0 } else { 0.0 }
}

/// The vector emitted when the history/merchant-stats fetch itself fails
/// (§4.2 "Failure"). Channel flags and categorical encodings still derive
/// from the transaction since those never depend on history.
pub fn default_vector(txn: &Transaction) -> FeatureVector {
    FeatureVector {
        amount: txn.amount_f64(),
        amount_z_score: 0.0,
        amount_log: (txn.amount_f64() + 1.0).ln(),
        amount_rolling_mean_1h: 0.0,
        amount_rolling_std_1h: 1.0,
        amount_rolling_mean_24h: 0.0,
        amount_rolling_std_24h: 1.0,
        txn_count_5m: 0.0,
        txn_count_1h: 0.0,
        txn_count_24h: 0.0,
        distinct_merchants_5m: 0.0,
        distinct_merchants_1h: 0.0,
        distinct_merchants_24h: 0.0,
        distance_from_home: 0.0,
        speed_from_last_txn: None,
        country_change: false,
        city_change: false,
        hour_of_day: txn.ts.hour() as f64,
        day_of_week: txn.ts.weekday().num_days_from_monday() as f64,
        is_holiday: false,
        is_weekend: txn.ts.weekday().num_days_from_monday() >= 5,
        merchant_fraud_rate: 0.0,
        mcc_fraud_rate: 0.01,
        merchant_txn_count: 0.0,
        device_rarity_score: 1.0,
        ip_rarity_score: 1.0,
        device_change: false,
        ip_change: false,
        channel_card_present: channel_flag(txn.channel, Channel::CardPresent),
        channel_web: channel_flag(txn.channel, Channel::Web),
        channel_app: channel_flag(txn.channel, Channel::App),
        merchant_id_encoded: 0.5,
        mcc_encoded: 0.5,
        country_encoded: 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MerchantStatsCache;
    use crate::history::InMemoryHistoryStore;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn txn_at(ts: chrono::DateTime<Utc>, amount: &str, country: &str, city: &str) -> Transaction {
        Transaction {
            txn_id: "txn_x".into(),
            ts,
            amount: rust_decimal::Decimal::from_str(amount).unwrap(),
            currency: "USD".into(),
            merchant_id: "m_1".into(),
            merchant_cat: "retail".into(),
            mcc: "5411".into(),
            country: country.into(),
            city: city.into(),
            lat: Some(40.7128),
            lon: Some(-74.0060),
            channel: Channel::CardPresent,
            card_id: "card_1".into(),
            customer_id: "cust_1".into(),
            device_id: None,
            ip: None,
            is_fraud: None,
        }
    }

    fn engineer() -> FeatureEngineer {
        let history = Arc::new(InMemoryHistoryStore::new());
        let cache = MerchantStatsCache::new(history.clone(), 1000, 60);
        FeatureEngineer::new(history, cache)
    }

    /// Scenario 1: baseline benign, empty history.
    #[tokio::test]
    async fn empty_history_yields_zeroed_velocity_features() {
        let fe = engineer();
        let txn = txn_at(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(), "100.00", "US", "NY");
        let fv = fe.compute(&txn).await;
        assert_eq!(fv.txn_count_5m, 0.0);
        assert_eq!(fv.txn_count_1h, 0.0);
        assert_eq!(fv.txn_count_24h, 0.0);
        assert_eq!(fv.amount_z_score, 0.0);
        assert!(!fv.country_change);
        assert!(!fv.city_change);
        assert!(!fv.device_change);
        assert!(!fv.ip_change);
    }

    /// P6: exactly one channel flag is 1.0 for card_present.
    #[tokio::test]
    async fn channel_one_hot_for_card_present() {
        let fe = engineer();
        let txn = txn_at(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(), "100.00", "US", "NY");
        let fv = fe.compute(&txn).await;
        assert_eq!(fv.channel_card_present, 1.0);
        assert_eq!(fv.channel_web, 0.0);
        assert_eq!(fv.channel_app, 0.0);
    }

    #[tokio::test]
    async fn weekend_flag_follows_day_of_week() {
        let fe = engineer();
        // 2024-01-06 is a Saturday.
        let txn = txn_at(Utc.with_ymd_and_hms(2024, 1, 6, 10, 0, 0).unwrap(), "50.00", "US", "NY");
        let fv = fe.compute(&txn).await;
        assert!(fv.is_weekend);
        assert_eq!(fv.day_of_week, 5.0);
    }

    #[test]
    fn default_vector_fills_categorical_defaults() {
        let txn = txn_at(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(), "100.00", "US", "NY");
        let fv = default_vector(&txn);
        assert_eq!(fv.merchant_id_encoded, 0.5);
        assert_eq!(fv.mcc_fraud_rate, 0.01);
        assert_eq!(fv.channel_card_present, 1.0);
    }
}
