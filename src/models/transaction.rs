use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::common::Channel;

/// Immutable payment event. Identity is the opaque `txn_id`.
///
/// Invariant: `amount > 0`. `lat`/`lon` are either both present or both
/// absent — a single present coordinate makes `speed_from_last_txn` and
/// distance features inapplicable for this record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, Validate)]
pub struct Transaction {
    pub txn_id: String,
    pub ts: DateTime<Utc>,
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub merchant_id: String,
    pub merchant_cat: String,
    pub mcc: String,
    pub country: String,
    pub city: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: Option<f64>,
    pub channel: Channel,
    pub card_id: String,
    pub customer_id: String,
    pub device_id: Option<String>,
    pub ip: Option<String>,
    /// Ground truth used only offline (merchant aggregate computation), never read
    /// at scoring time.
    pub is_fraud: Option<bool>,
}

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("amount_must_be_positive"))
    }
}

impl Transaction {
    /// Both-or-neither coordinate invariant from §3; callers skip distance
    /// features rather than reject the transaction when it doesn't hold.
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn amount_f64(&self) -> f64 {
        self.amount.try_into().unwrap_or(0.0)
    }
}

/// A single prior transaction as read back from history, carrying only the
/// fields the feature engineer needs (§4.1).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub ts: DateTime<Utc>,
    pub amount: Decimal,
    pub merchant_id: String,
    pub country: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub device_id: Option<String>,
    pub ip: Option<String>,
}

impl HistoryRecord {
    pub fn amount_f64(&self) -> f64 {
        self.amount.try_into().unwrap_or(0.0)
    }
}
