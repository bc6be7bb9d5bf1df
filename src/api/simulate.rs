//! Synthetic scenario generator (§6 `POST /simulate`). Mirrors the
//! original service: build a canned transaction for the requested
//! scenario and publish it to `transactions.raw`; the stream processor
//! picks it up and scores it like any other inbound record.

use std::str::FromStr;

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Channel, SimulationScenario, Transaction};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub scenario: SimulationScenario,
    pub customer_id: Option<String>,
    pub card_id: Option<String>,
    pub amount: Option<f64>,
    pub merchant_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub txn_id: String,
    pub scenario: SimulationScenario,
    pub message: String,
}

fn base_transaction() -> Transaction {
    Transaction {
        txn_id: Uuid::new_v4().to_string(),
        ts: chrono::Utc::now(),
        amount: Decimal::from_str("100.00").unwrap(),
        currency: "USD".into(),
        merchant_id: "MERCH001".into(),
        merchant_cat: "retail".into(),
        mcc: "5411".into(),
        country: "US".into(),
        city: "New York".into(),
        lat: Some(40.7128),
        lon: Some(-74.0060),
        channel: Channel::CardPresent,
        card_id: "CARD001".into(),
        customer_id: "CUST001".into(),
        device_id: Some("DEVICE001".into()),
        ip: Some("192.168.1.1".into()),
        is_fraud: None,
    }
}

/// Applies the scenario's canned overrides, then the caller's explicit
/// overrides on top (§6: `{scenario, optional overrides}`).
fn synthetic_transaction(request: &SimulateRequest) -> Transaction {
    let mut txn = base_transaction();

    match request.scenario {
        SimulationScenario::ImpossibleTravel => {
            txn.country = "UK".into();
            txn.city = "London".into();
            txn.lat = Some(51.5074);
            txn.lon = Some(-0.1278);
            txn.amount = Decimal::from_str("500.00").unwrap();
        }
        SimulationScenario::HighAmount => {
            txn.amount = Decimal::from_str("10000.00").unwrap();
            txn.merchant_cat = "electronics".into();
        }
        SimulationScenario::VelocityAttack => {
            txn.amount = Decimal::from_str("50.00").unwrap();
            txn.merchant_cat = "gas_station".into();
        }
        SimulationScenario::CardNotPresent => {
            txn.channel = Channel::Web;
            txn.amount = Decimal::from_str("200.00").unwrap();
            txn.merchant_cat = "online_retail".into();
        }
        SimulationScenario::MerchantTriangulation => {
            txn.merchant_id = "MERCH_RING_01".into();
            txn.merchant_cat = "crypto_exchange".into();
            txn.amount = Decimal::from_str("750.00").unwrap();
        }
    }

    if let Some(customer_id) = &request.customer_id {
        txn.customer_id = customer_id.clone();
    }
    if let Some(card_id) = &request.card_id {
        txn.card_id = card_id.clone();
    }
    if let Some(merchant_id) = &request.merchant_id {
        txn.merchant_id = merchant_id.clone();
    }
    if let Some(amount) = request.amount {
        txn.amount = Decimal::from_str(&format!("{amount:.2}")).unwrap_or(txn.amount);
    }

    txn
}

pub async fn simulate_transaction(
    State(state): State<AppState>,
    Json(request): Json<SimulateRequest>,
) -> AppResult<Json<SimulateResponse>> {
    let transaction = synthetic_transaction(&request);
    let txn_id = transaction.txn_id.clone();
    let scenario = request.scenario;

    let publisher = state.publisher.clone();
    tokio::spawn(async move {
        if let Err(e) = publisher.publish_transaction(&transaction).await {
            tracing::warn!(error = %e, txn_id = %transaction.txn_id, "simulated transaction publish failed");
        }
    });

    Ok(Json(SimulateResponse { txn_id, scenario, message: "simulation transaction sent".to_string() }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::bus::InMemoryPublisher;
    use crate::cache::MerchantStatsCache;
    use crate::features::FeatureEngineer;
    use crate::history::InMemoryHistoryStore;
    use crate::metrics::Metrics;
    use crate::models::{FeatureVector, ScoreResult};
    use crate::pipeline::Pipeline;
    use crate::scoring::Scorer;

    struct FixedScorer;
    impl Scorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> ScoreResult {
            ScoreResult::fallback(0.95)
        }
    }

    fn test_state() -> AppState {
        let history = Arc::new(InMemoryHistoryStore::new());
        let cache = MerchantStatsCache::new(history.clone(), 1_000, 60);
        let features = Arc::new(FeatureEngineer::new(history.clone(), cache));
        let pipeline = Arc::new(Pipeline::new(history.clone(), features, Arc::new(FixedScorer)));
        AppState {
            history,
            publisher: Arc::new(InMemoryPublisher::new()),
            pipeline,
            metrics: Arc::new(Metrics::new().unwrap()),
            sync_deadline: Duration::from_secs(2),
        }
    }

    #[test]
    fn impossible_travel_scenario_sets_a_foreign_country() {
        let request = SimulateRequest {
            scenario: SimulationScenario::ImpossibleTravel,
            customer_id: None,
            card_id: None,
            amount: None,
            merchant_id: None,
        };
        let txn = synthetic_transaction(&request);
        assert_eq!(txn.country, "UK");
    }

    #[test]
    fn explicit_overrides_win_over_scenario_defaults() {
        let request = SimulateRequest {
            scenario: SimulationScenario::HighAmount,
            customer_id: Some("cust_42".into()),
            card_id: None,
            amount: Some(9.99),
            merchant_id: None,
        };
        let txn = synthetic_transaction(&request);
        assert_eq!(txn.customer_id, "cust_42");
        assert_eq!(txn.amount, Decimal::from_str("9.99").unwrap());
    }

    #[tokio::test]
    async fn endpoint_returns_the_scenario_and_a_txn_id() {
        let app = super::super::routes().with_state(test_state());
        let body = serde_json::json!({"scenario": "velocity_attack"}).to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/simulate")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
