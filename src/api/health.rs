//! Aggregate health check (§6 `GET /health`): storage, bus, and model
//! availability. Models are loaded once at startup and never re-checked
//! since they're read-only thereafter (§5).

use axum::{Json, extract::State};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub database: String,
    pub bus: String,
    pub models: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub services: ServiceHealth,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();

    let database = match state.history.health_check().await {
        Ok(true) => "healthy".to_string(),
        Ok(false) | Err(_) => {
            status = "degraded".to_string();
            "unhealthy".to_string()
        }
    };

    let bus = match state.publisher.health_check().await {
        Ok(true) => "healthy".to_string(),
        Ok(false) | Err(_) => {
            status = "degraded".to_string();
            "unhealthy".to_string()
        }
    };

    Json(HealthResponse {
        status,
        timestamp: chrono::Utc::now(),
        services: ServiceHealth { database, bus, models: "healthy".to_string() },
    })
}
