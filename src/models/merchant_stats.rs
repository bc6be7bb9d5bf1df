use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Aggregate merchant reputation signal, keyed by `merchant_id` (§3).
/// Read-mostly; refreshed lazily through the merchant stats cache (C8).
#[derive(Debug, Clone, Copy, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MerchantStats {
    pub total_transactions: i64,
    pub avg_amount: f64,
    pub fraud_count: i64,
    pub fraud_rate: f64,
}

impl MerchantStats {
    /// Returned when a merchant has no historical transactions (§4.1).
    pub fn zero() -> Self {
        MerchantStats {
            total_transactions: 0,
            avg_amount: 0.0,
            fraud_count: 0,
            fraud_rate: 0.0,
        }
    }
}

impl Default for MerchantStats {
    fn default() -> Self {
        MerchantStats::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_has_zero_fraud_rate() {
        let stats = MerchantStats::zero();
        assert_eq!(stats.total_transactions, 0);
        assert_eq!(stats.fraud_rate, 0.0);
    }
}
