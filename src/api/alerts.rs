//! Read-only alert listing (§6 `GET /alerts`, `GET /alerts/{id}`).

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::Alert;

use super::AppState;

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub since: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct AlertList {
    pub alerts: Vec<Alert>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> AppResult<Json<AlertList>> {
    let since = query.since.unwrap_or_else(|| Utc::now() - ChronoDuration::hours(24));
    let alerts = state.history.get_alerts(since, query.limit, query.offset).await?;
    let total = state.history.get_alert_count(since).await?;
    Ok(Json(AlertList { alerts, total, limit: query.limit, offset: query.offset }))
}

pub async fn get_alert(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Alert>> {
    let alert = state.history.get_alert(&id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(alert))
}
