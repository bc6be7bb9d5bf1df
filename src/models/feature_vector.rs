use serde::{Deserialize, Serialize};

/// Number of fields in the canonical feature vector (§4.2 of the spec).
pub const FEATURE_COUNT: usize = 34;

/// Fixed-arity numeric feature vector derived from one transaction plus a
/// point-in-time window snapshot. Field order here is the one canonical
/// order used by every scorer and every serialization (P1): adding a field
/// requires appending it, never reordering existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub amount: f64,
    pub amount_z_score: f64,
    pub amount_log: f64,
    pub amount_rolling_mean_1h: f64,
    pub amount_rolling_std_1h: f64,
    pub amount_rolling_mean_24h: f64,
    pub amount_rolling_std_24h: f64,
    pub txn_count_5m: f64,
    pub txn_count_1h: f64,
    pub txn_count_24h: f64,
    pub distinct_merchants_5m: f64,
    pub distinct_merchants_1h: f64,
    pub distinct_merchants_24h: f64,
    pub distance_from_home: f64,
    pub speed_from_last_txn: Option<f64>,
    pub country_change: bool,
    pub city_change: bool,
    pub hour_of_day: f64,
    pub day_of_week: f64,
    pub is_holiday: bool,
    pub is_weekend: bool,
    pub merchant_fraud_rate: f64,
    pub mcc_fraud_rate: f64,
    pub merchant_txn_count: f64,
    pub device_rarity_score: f64,
    pub ip_rarity_score: f64,
    pub device_change: bool,
    pub ip_change: bool,
    pub channel_card_present: f64,
    pub channel_web: f64,
    pub channel_app: f64,
    pub merchant_id_encoded: f64,
    pub mcc_encoded: f64,
    pub country_encoded: f64,
}

/// Canonical field names, in the exact order `to_array` emits them. Used by
/// the ensemble's explanation payload and by tests asserting P1.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "amount",
    "amount_z_score",
    "amount_log",
    "amount_rolling_mean_1h",
    "amount_rolling_std_1h",
    "amount_rolling_mean_24h",
    "amount_rolling_std_24h",
    "txn_count_5m",
    "txn_count_1h",
    "txn_count_24h",
    "distinct_merchants_5m",
    "distinct_merchants_1h",
    "distinct_merchants_24h",
    "distance_from_home",
    "speed_from_last_txn",
    "country_change",
    "city_change",
    "hour_of_day",
    "day_of_week",
    "is_holiday",
    "is_weekend",
    "merchant_fraud_rate",
    "mcc_fraud_rate",
    "merchant_txn_count",
    "device_rarity_score",
    "ip_rarity_score",
    "device_change",
    "ip_change",
    "channel_card_present",
    "channel_web",
    "channel_app",
    "merchant_id_encoded",
    "mcc_encoded",
    "country_encoded",
];

impl FeatureVector {
    /// Flattens to the canonical `[f64; 34]` array consumed by both scorers.
    /// Booleans encode as 0.0/1.0; a missing `speed_from_last_txn` encodes as
    /// 0.0 (there is no prior transaction, or the pair is inapplicable).
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.amount,
            self.amount_z_score,
            self.amount_log,
            self.amount_rolling_mean_1h,
            self.amount_rolling_std_1h,
            self.amount_rolling_mean_24h,
            self.amount_rolling_std_24h,
            self.txn_count_5m,
            self.txn_count_1h,
            self.txn_count_24h,
            self.distinct_merchants_5m,
            self.distinct_merchants_1h,
            self.distinct_merchants_24h,
            self.distance_from_home,
            self.speed_from_last_txn.unwrap_or(0.0),
            bool_f64(self.country_change),
            bool_f64(self.city_change),
            self.hour_of_day,
            self.day_of_week,
            bool_f64(self.is_holiday),
            bool_f64(self.is_weekend),
            self.merchant_fraud_rate,
            self.mcc_fraud_rate,
            self.merchant_txn_count,
            self.device_rarity_score,
            self.ip_rarity_score,
            bool_f64(self.device_change),
            bool_f64(self.ip_change),
            self.channel_card_present,
            self.channel_web,
            self.channel_app,
            self.merchant_id_encoded,
            self.mcc_encoded,
            self.country_encoded,
        ]
    }
}

fn bool_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}
