use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use riskline::bus::InMemoryPublisher;
use riskline::cache::MerchantStatsCache;
use riskline::config::Config;
use riskline::features::FeatureEngineer;
use riskline::history::{HistoryStore, InMemoryHistoryStore};
use riskline::metrics::Metrics;
use riskline::models::{FeatureVector, ScoreResult};
use riskline::pipeline::Pipeline;
use riskline::scoring::Scorer;
use riskline::server::create_app;

/// Always scores above the default 0.95 threshold, so alert-raising
/// scenarios don't depend on the trained ensemble's actual output.
struct AlertingScorer;
impl Scorer for AlertingScorer {
    fn score(&self, _features: &FeatureVector) -> ScoreResult {
        ScoreResult::fallback(0.99)
    }
}

struct QuietScorer;
impl Scorer for QuietScorer {
    fn score(&self, _features: &FeatureVector) -> ScoreResult {
        ScoreResult::fallback(0.10)
    }
}

fn build_app(scorer: Arc<dyn Scorer>) -> (Router, Arc<InMemoryHistoryStore>) {
    let history = Arc::new(InMemoryHistoryStore::new());
    let cache = MerchantStatsCache::new(history.clone(), 1_000, 60);
    let features = Arc::new(FeatureEngineer::new(history.clone(), cache));
    let pipeline = Arc::new(Pipeline::new(history.clone(), features, scorer));
    let app = create_app(
        history.clone(),
        Arc::new(InMemoryPublisher::new()),
        pipeline,
        Arc::new(Metrics::new().unwrap()),
        &Config::default(),
    );
    (app, history)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_transaction_payload() -> Value {
    json!({
        "amount": 250.00,
        "merchant_cat": "retail",
        "merchant_id": "MERCH001",
        "mcc": "5411",
        "currency": "USD",
        "country": "US",
        "city": "New York",
        "lat": 40.7128,
        "lon": -74.0060,
        "channel": "card_present",
        "card_id": "CARD001",
        "customer_id": "CUST001",
        "device_id": "DEVICE001",
        "ip": "192.168.1.1"
    })
}

/// Scenario: a transaction scored below the threshold is persisted but
/// raises no alert, and does not show up in `GET /alerts`.
#[tokio::test]
async fn quiet_transaction_is_scored_but_raises_no_alert() {
    let (app, _history) = build_app(Arc::new(QuietScorer));

    let request = Request::builder()
        .method("POST")
        .uri("/score")
        .header("content-type", "application/json")
        .body(Body::from(valid_transaction_payload().to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed["is_alert"], false);

    let request = Request::builder().uri("/alerts").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let parsed = body_json(response).await;
    assert_eq!(parsed["total"], 0);
}

/// Scenario: a transaction scored above the threshold is persisted,
/// raises an alert, and that alert is retrievable both via the list and
/// single-resource endpoints.
#[tokio::test]
async fn alerting_transaction_is_retrievable_afterwards() {
    let (app, _history) = build_app(Arc::new(AlertingScorer));

    let request = Request::builder()
        .method("POST")
        .uri("/score")
        .header("content-type", "application/json")
        .body(Body::from(valid_transaction_payload().to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let scored = body_json(response).await;
    assert_eq!(scored["is_alert"], true);

    let request = Request::builder().uri("/alerts").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let list = body_json(response).await;
    assert_eq!(list["total"], 1);
    let alert_id = list["alerts"][0]["alert_id"].as_str().unwrap().to_string();

    let request = Request::builder().uri(format!("/alerts/{alert_id}")).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let alert = body_json(response).await;
    assert_eq!(alert["txn_id"], scored["txn_id"]);
}

/// A transaction with a non-positive amount never reaches the scorer.
#[tokio::test]
async fn invalid_transaction_is_rejected_before_scoring() {
    let (app, _history) = build_app(Arc::new(AlertingScorer));

    let mut payload = valid_transaction_payload();
    payload["amount"] = json!(-5.0);

    let request = Request::builder()
        .method("POST")
        .uri("/score")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// `/simulate` never scores inline — it only accepts the scenario and
/// hands back a synthetic txn_id; scoring is the stream processor's job.
#[tokio::test]
async fn simulate_endpoint_accepts_every_scenario() {
    let (app, _history) = build_app(Arc::new(AlertingScorer));

    for scenario in [
        "impossible_travel",
        "high_amount",
        "velocity_attack",
        "card_not_present",
        "merchant_triangulation",
    ] {
        let request = Request::builder()
            .method("POST")
            .uri("/simulate")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "scenario": scenario }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "scenario {scenario} failed");
        let parsed = body_json(response).await;
        assert!(!parsed["txn_id"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn health_reports_healthy_dependencies() {
    let (app, _history) = build_app(Arc::new(AlertingScorer));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed["status"], "healthy");
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let (app, _history) = build_app(Arc::new(AlertingScorer));
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("fraud_detector_requests_total"));
}

#[tokio::test]
async fn root_and_security_headers() {
    let (app, _history) = build_app(Arc::new(AlertingScorer));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-content-type-options"));
    assert!(response.headers().contains_key("strict-transport-security"));
}
