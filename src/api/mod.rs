//! HTTP surface (C7 plus read-only endpoints). Handlers share one
//! `AppState` built once at startup and cloned (cheaply, via `Arc`) into
//! each request.

pub mod alerts;
pub mod health;
pub mod metrics;
pub mod score;
pub mod simulate;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};

use crate::bus::Publisher;
use crate::history::HistoryStore;
use crate::metrics::Metrics;
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<dyn HistoryStore>,
    pub publisher: Arc<dyn Publisher>,
    pub pipeline: Arc<Pipeline>,
    pub metrics: Arc<Metrics>,
    pub sync_deadline: Duration,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/score", post(score::score_transaction))
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/{id}", get(alerts::get_alert))
        .route("/simulate", post(simulate::simulate_transaction))
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics))
}
