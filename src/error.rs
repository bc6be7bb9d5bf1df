//! Error taxonomy shared by the HTTP surface and the stream processor (§7).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error codes for the synchronous API.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    StorageUnavailable,
    ModelUnavailable,
    NotFound,
    InternalError,
}

/// How the stream processor (C6) should react to a failure at a given
/// pipeline step (§4.6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDisposition {
    /// Drop the record, log, do not retry.
    DropAndLog,
    /// Do not commit the offset; the broker will redeliver.
    Redeliver,
    /// Record is never dropped; a fallback score was substituted instead.
    Continue,
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// amount <= 0, lat/lon out of range, unknown channel, malformed JSON.
    #[error("validation error: {0}")]
    Validation(String),

    /// No storage connectivity.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] anyhow::Error),

    /// Publish to the bus failed.
    #[error("bus unavailable: {0}")]
    BusUnavailable(#[source] anyhow::Error),

    /// Model artifacts missing and training-on-boot disabled. Startup-fatal.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Numeric error, NaN, shape mismatch during scoring. Never propagated to
    /// the caller as a failure — the pipeline substitutes a fallback score
    /// (`ScoreResult::fallback`) and continues.
    #[error("scoring failed: {0}")]
    ScoringFailed(String),

    /// A pipeline invocation exceeded its deadline (§5).
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Alert id or txn id not found.
    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps a failure at a given state-machine step to what the stream
    /// processor should do next (§4.6, §7). `ScoringFailed` is absent here
    /// because it never reaches this far — it is absorbed into a fallback
    /// score before the pipeline can fail on it.
    pub fn stream_disposition(&self) -> StreamDisposition {
        match self {
            AppError::Validation(_) => StreamDisposition::DropAndLog,
            AppError::StorageUnavailable(_) => StreamDisposition::Redeliver,
            AppError::BusUnavailable(_) => StreamDisposition::Redeliver,
            AppError::Timeout(_) => StreamDisposition::Redeliver,
            AppError::ModelUnavailable(_) => StreamDisposition::Redeliver,
            AppError::ScoringFailed(_) => StreamDisposition::Continue,
            AppError::NotFound | AppError::Internal(_) => StreamDisposition::DropAndLog,
        }
    }

    fn to_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: ErrorCode::ValidationError,
                    message: msg.clone(),
                },
            ),
            AppError::StorageUnavailable(e) => {
                tracing::error!(error = %e, "storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: ErrorCode::StorageUnavailable,
                        message: "storage unavailable".to_string(),
                    },
                )
            }
            AppError::BusUnavailable(e) => {
                tracing::warn!(error = %e, "bus unavailable, response still succeeds");
                (
                    StatusCode::OK,
                    ErrorResponse {
                        error: ErrorCode::InternalError,
                        message: "accepted, publish deferred".to_string(),
                    },
                )
            }
            AppError::ModelUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: ErrorCode::ModelUnavailable,
                    message: msg.clone(),
                },
            ),
            AppError::ScoringFailed(msg) => {
                tracing::warn!(reason = %msg, "scoring failed, fallback score substituted");
                (
                    StatusCode::OK,
                    ErrorResponse {
                        error: ErrorCode::InternalError,
                        message: "scored with fallback model".to_string(),
                    },
                )
            }
            AppError::Timeout(d) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse {
                    error: ErrorCode::InternalError,
                    message: format!("timed out after {d:?}"),
                },
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: ErrorCode::NotFound,
                    message: "resource not found".to_string(),
                },
            ),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: ErrorCode::InternalError,
                        message: "internal error".to_string(),
                    },
                )
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_response();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_unavailable_requires_redelivery() {
        let err = AppError::StorageUnavailable(anyhow::anyhow!("connection reset"));
        assert_eq!(err.stream_disposition(), StreamDisposition::Redeliver);
    }

    #[test]
    fn validation_error_drops_the_record() {
        let err = AppError::Validation("amount must be positive".into());
        assert_eq!(err.stream_disposition(), StreamDisposition::DropAndLog);
    }

    #[test]
    fn scoring_failed_never_stops_ingestion() {
        let err = AppError::ScoringFailed("NaN in reconstruction".into());
        assert_eq!(err.stream_disposition(), StreamDisposition::Continue);
    }
}
