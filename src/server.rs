//! HTTP server and routing.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::Response,
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::api::{self, AppState};
use crate::bus::Publisher;
use crate::config::Config;
use crate::history::HistoryStore;
use crate::metrics::Metrics;
use crate::pipeline::Pipeline;

/// Builds the router from already-constructed singletons. Construction of
/// the singletons (DB pool, Kafka clients, trained models) is `main`'s
/// job, so tests can substitute in-memory doubles here instead.
pub fn create_app(
    history: Arc<dyn HistoryStore>,
    publisher: Arc<dyn Publisher>,
    pipeline: Arc<Pipeline>,
    metrics: Arc<Metrics>,
    config: &Config,
) -> Router {
    let state = AppState {
        history,
        publisher,
        pipeline,
        metrics,
        sync_deadline: Duration::from_millis(config.server.sync_deadline_ms),
    };

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);
    for origin in &config.cors.origins {
        if let Ok(header_value) = origin.parse::<HeaderValue>() {
            cors = cors.allow_origin(header_value);
        }
    }

    Router::new()
        .merge(api::routes())
        .route("/", get(root_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_seconds)))
                .layer(axum::middleware::from_fn(security_headers))
                .layer(cors),
        )
}

async fn root_handler() -> &'static str {
    "real-time transaction risk evaluator"
}

/// Security headers middleware.
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-XSS-Protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.remove("server");

    response
}
