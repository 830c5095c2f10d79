use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("No pending payment for user {0}, start a new purchase first")]
    NoPendingIntent(i64),

    #[error("A payment check is already running for user {0}")]
    DuplicateCheckInFlight(i64),

    #[error("No active subscription for user {0}")]
    SubscriptionNotFound(i64),

    #[error("Subscription store error: {0}")]
    Store(String),
}

/// Failure of a single ledger query. Never retried by the fetcher itself.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Ledger request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ledger API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Ledger response could not be decoded: {0}")]
    Decode(String),
}

impl From<redis::RedisError> for GateError {
    fn from(err: redis::RedisError) -> Self {
        GateError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::Store(format!("serialization: {}", err))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl GateError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GateError::NoPendingIntent(_) => (StatusCode::NOT_FOUND, "NO_PENDING_INTENT"),
            GateError::DuplicateCheckInFlight(_) => (StatusCode::CONFLICT, "CHECK_IN_FLIGHT"),
            GateError::SubscriptionNotFound(_) => {
                (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND")
            }
            GateError::Store(_) => (StatusCode::BAD_GATEWAY, "STORE_ERROR"),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, error_code = error_code, "Request failed");
        } else {
            tracing::info!(error = %self, error_code = error_code, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}
