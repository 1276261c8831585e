//! API request and response structures

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::TimerError,
    state::{RegistrySnapshot, TimerDraft, TimerStatus},
};

/// Response for every intent endpoint: outcome plus the collections after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub timers: RegistrySnapshot,
}

impl ApiResponse {
    pub fn ok(message: String, timers: RegistrySnapshot) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: Utc::now(),
            timers,
        }
    }
}

/// Error body returned with a non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Handler error carrying the HTTP status to answer with
#[derive(Debug)]
pub struct ApiError {
    pub code: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: String) -> Self {
        Self { code: StatusCode::NOT_FOUND, message }
    }

    pub fn conflict(message: String) -> Self {
        Self { code: StatusCode::CONFLICT, message }
    }
}

/// Bodies that are not JSON or do not fit the request shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { code: StatusCode::BAD_REQUEST, message: rejection.body_text() }
    }
}

impl From<TimerError> for ApiError {
    fn from(error: TimerError) -> Self {
        let code = match error {
            TimerError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { code, message: error.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.message,
            timestamp: Utc::now(),
        };
        (self.code, Json(body)).into_response()
    }
}

/// Duration as sent by a form (text) or a JSON client (number)
///
/// Any JSON number is accepted here; whether it is a whole number of
/// seconds is decided by draft validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Number(serde_json::Number),
    Text(String),
}

/// Body of `POST /timers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTimerRequest {
    #[serde(default)]
    pub name: String,
    pub duration: Option<DurationInput>,
    #[serde(default)]
    pub category: String,
}

impl AddTimerRequest {
    pub fn into_draft(self) -> TimerDraft {
        let duration = match self.duration {
            Some(DurationInput::Number(number)) => number.to_string(),
            Some(DurationInput::Text(text)) => text,
            None => String::new(),
        };
        TimerDraft::new(self.name, duration, self.category)
    }
}

/// Body of `POST /timers/:id/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: TimerStatus,
    pub remaining: Option<u64>,
}

/// Status response with service metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub active_timers: usize,
    pub running_timers: usize,
    pub completed_timers: usize,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
