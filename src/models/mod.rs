pub mod alert;
pub mod common;
pub mod feature_vector;
pub mod merchant_stats;
pub mod score;
pub mod transaction;

pub use alert::{Alert, AlertRow};
pub use common::{AlertStatus, Channel, SimulationScenario};
pub use feature_vector::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use merchant_stats::MerchantStats;
pub use score::{Explanation, FeatureContribution, RiskFactors, ScoreResult};
pub use transaction::{HistoryRecord, Transaction};
