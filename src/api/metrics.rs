//! Prometheus scrape endpoint (§6 `GET /metrics`).

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::AppState;

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
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

    struct FixedScorer;
    impl Scorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> ScoreResult {
            ScoreResult::fallback(0.95)
        }
    }

    #[tokio::test]
    async fn exposes_prometheus_text_format() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let cache = MerchantStatsCache::new(history.clone(), 1_000, 60);
        let features = Arc::new(FeatureEngineer::new(history.clone(), cache));
        let pipeline = Arc::new(Pipeline::new(history.clone(), features, Arc::new(FixedScorer)));
        let state = AppState {
            history,
            publisher: Arc::new(InMemoryPublisher::new()),
            pipeline,
            metrics: Arc::new(Metrics::new().unwrap()),
            sync_deadline: Duration::from_secs(2),
        };
        let app = super::super::routes().with_state(state);
        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("fraud_detector_"));
    }
}
