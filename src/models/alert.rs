use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::AlertStatus;
use super::score::Explanation;

/// Raised when a `ScoreResult.is_alert` holds. Identity is `alert_id`;
/// lifecycle `new -> reviewing -> {resolved | false_positive}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub txn_id: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub status: AlertStatus,
    pub explanation: Explanation,
    pub analyst_notes: Option<String>,
    pub resolution: Option<String>,
}

impl Alert {
    pub fn new(alert_id: String, txn_id: String, score: f64, explanation: Explanation) -> Self {
        Alert {
            alert_id,
            txn_id,
            score,
            timestamp: Utc::now(),
            status: AlertStatus::New,
            explanation,
            analyst_notes: None,
            resolution: None,
        }
    }
}

/// Row shape read back from the `alerts` relation; `explanation` is stored as
/// JSONB and decoded into `Explanation` by the history store.
#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub alert_id: String,
    pub txn_id: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub explanation: serde_json::Value,
    pub analyst_notes: Option<String>,
    pub resolution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::score::{FeatureContribution, RiskFactors};

    fn explanation() -> Explanation {
        Explanation {
            ensemble_score: 0.97,
            isolation_forest_score: 0.9,
            autoencoder_score: 1.0,
            top_contributing_features: vec![FeatureContribution {
                feature: "amount_z_score".into(),
                contribution: 3.1,
            }],
            risk_factors: RiskFactors {
                high_amount: true,
                high_velocity: false,
                geographic_anomaly: false,
                suspicious_merchant: false,
                device_anomaly: false,
            },
            counterfactuals: vec!["Reduce transaction amount".into()],
        }
    }

    #[test]
    fn new_alert_starts_in_new_status() {
        let alert = Alert::new("a1".into(), "t1".into(), 0.97, explanation());
        assert_eq!(alert.status, AlertStatus::New);
        assert!(alert.analyst_notes.is_none());
    }
}
