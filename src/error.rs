use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("event not found")]
    EventNotFound,

    #[error("event is inactive or has already started, betting is not possible")]
    EventNotActive,

    #[error("event already finalized")]
    EventAlreadyFinalized,

    #[error("invalid result for event finalization")]
    InvalidFinalizationResult,

    #[error("failed to save bet")]
    SavingBetFailed,

    #[error("failed to update bet {bet_id}: {reason}")]
    BetUpdateFailed { bet_id: String, reason: String },

    #[error("failed to notify payout service for bet {bet_id}: {reason}")]
    PayoutNotificationFailed { bet_id: String, reason: String },

    #[error("couldn't cancel {failed} bet(s)")]
    BetCancellationFailed { failed: usize },

    #[error("finalization of event {event_id} completed with {} error(s): {}", .errors.len(), join_errors(.errors))]
    Finalization {
        event_id: String,
        errors: Vec<AppError>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid upstream event: {0}")]
    Mapping(String),

    #[error("upstream event source returned status {0}")]
    UpstreamStatus(u16),

    #[error("payout service returned status {0}")]
    PayoutStatus(u16),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

fn join_errors(errors: &[AppError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::EventNotFound => StatusCode::NOT_FOUND,
            AppError::EventNotActive | AppError::EventAlreadyFinalized => StatusCode::CONFLICT,
            AppError::InvalidFinalizationResult
            | AppError::Validation(_)
            | AppError::Mapping(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        // Dependency failures carry driver details; clients get a generic
        // message while the full error stays in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
