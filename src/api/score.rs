//! Synchronous Request Path (C7, §4.7). Same pipeline as the stream
//! processor; the bus publish is deferred to a background task so its
//! failure never affects the response.

use std::str::FromStr;
use std::time::Instant;

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Channel, Explanation, Transaction};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub amount: f64,
    pub merchant_cat: String,
    pub merchant_id: String,
    pub mcc: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub country: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub channel: Channel,
    pub card_id: String,
    pub customer_id: String,
    pub device_id: Option<String>,
    pub ip: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub txn_id: String,
    pub score: f64,
    pub threshold: f64,
    pub is_alert: bool,
    pub model_used: String,
    pub confidence: f64,
    pub explanation: Explanation,
}

pub async fn score_transaction(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> AppResult<Json<ScoreResponse>> {
    let start = Instant::now();

    let amount = Decimal::from_str(&format!("{:.2}", request.amount))
        .map_err(|e| AppError::Validation(format!("invalid amount: {e}")))?;
    let transaction = Transaction {
        txn_id: Uuid::new_v4().to_string(),
        ts: chrono::Utc::now(),
        amount,
        currency: request.currency,
        merchant_id: request.merchant_id,
        merchant_cat: request.merchant_cat,
        mcc: request.mcc,
        country: request.country,
        city: request.city,
        lat: request.lat,
        lon: request.lon,
        channel: request.channel,
        card_id: request.card_id,
        customer_id: request.customer_id,
        device_id: request.device_id,
        ip: request.ip,
        is_fraud: None,
    };

    let outcome = state.pipeline.run(transaction, state.sync_deadline).await?;

    state.metrics.observe_score(outcome.score.score);
    if outcome.score.is_alert {
        state.metrics.record_alert();
    }
    state.metrics.record_request("/score", start.elapsed().as_secs_f64());

    let publisher = state.publisher.clone();
    let published_transaction = outcome.transaction.clone();
    let published_alert = outcome.alert.clone();
    tokio::spawn(async move {
        if let Err(e) = publisher.publish_transaction(&published_transaction).await {
            tracing::warn!(error = %e, txn_id = %published_transaction.txn_id, "background transaction publish failed");
        }
        if let Some(alert) = published_alert {
            if let Err(e) = publisher.publish_alert(&alert).await {
                tracing::warn!(error = %e, alert_id = %alert.alert_id, "background alert publish failed");
            }
        }
    });

    Ok(Json(ScoreResponse {
        txn_id: outcome.transaction.txn_id,
        score: outcome.score.score,
        threshold: outcome.score.threshold,
        is_alert: outcome.score.is_alert,
        model_used: outcome.score.model_used,
        confidence: outcome.score.confidence,
        explanation: outcome.score.explanation,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
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

    struct FixedScorer(ScoreResult);
    impl Scorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> ScoreResult {
            self.0.clone()
        }
    }

    fn test_state(scorer: ScoreResult) -> AppState {
        let history = Arc::new(InMemoryHistoryStore::new());
        let cache = MerchantStatsCache::new(history.clone(), 1_000, 60);
        let features = Arc::new(FeatureEngineer::new(history.clone(), cache));
        let pipeline = Arc::new(Pipeline::new(history.clone(), features, Arc::new(FixedScorer(scorer))));
        AppState {
            history,
            publisher: Arc::new(InMemoryPublisher::new()),
            pipeline,
            metrics: Arc::new(Metrics::new().unwrap()),
            sync_deadline: Duration::from_secs(2),
        }
    }

    fn sample_body() -> String {
        serde_json::json!({
            "amount": 42.0,
            "merchant_cat": "retail",
            "merchant_id": "m_1",
            "mcc": "5411",
            "currency": "USD",
            "country": "US",
            "city": "NY",
            "lat": null,
            "lon": null,
            "channel": "web",
            "card_id": "card_1",
            "customer_id": "cust_1",
            "device_id": null,
            "ip": null
        })
        .to_string()
    }

    #[tokio::test]
    async fn scores_a_valid_request() {
        let state = test_state(ScoreResult::fallback(0.95));
        let app = super::super::routes().with_state(state);
        let request = Request::builder()
            .method("POST")
            .uri("/score")
            .header("content-type", "application/json")
            .body(Body::from(sample_body()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: ScoreResponse = serde_json::from_slice(&body).unwrap();
        assert!(!parsed.txn_id.is_empty());
        assert_eq!(parsed.score, 0.5);
    }

    #[tokio::test]
    async fn rejects_a_negative_amount() {
        let state = test_state(ScoreResult::fallback(0.95));
        let app = super::super::routes().with_state(state);
        let mut body: serde_json::Value = serde_json::from_str(&sample_body()).unwrap();
        body["amount"] = serde_json::json!(-10.0);
        let request = Request::builder()
            .method("POST")
            .uri("/score")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
