use serde::{Deserialize, Serialize};

/// Channel through which a transaction was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    CardPresent,
    Web,
    App,
    Phone,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::CardPresent => "card_present",
            Channel::Web => "web",
            Channel::App => "app",
            Channel::Phone => "phone",
        }
    }
}

/// Lifecycle status of an alert: `new -> reviewing -> {resolved | false_positive}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Reviewing,
    Resolved,
    FalsePositive,
}

impl Default for AlertStatus {
    fn default() -> Self {
        AlertStatus::New
    }
}

/// Synthetic fraud scenario accepted by `POST /simulate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationScenario {
    ImpossibleTravel,
    HighAmount,
    VelocityAttack,
    CardNotPresent,
    MerchantTriangulation,
}
