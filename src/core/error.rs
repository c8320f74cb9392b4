//! Typed error handling for the events API
//!
//! Request handlers return [`ApiError`], which maps every failure to a
//! distinct HTTP status, a stable machine-readable code and a fixed
//! user-facing message.
//!
//! # Error Categories
//!
//! - [`EventError`]: event CRUD failures (conflict, not found, create/update)
//! - [`RequestError`]: caller identity and permission failures
//! - [`ValidationError`]: malformed payloads, query strings and path ids
//!
//! Delivery failures on the WebSocket side live in
//! [`crate::server::exposure::websocket::DeliveryError`]; they are recovered
//! by the connection registry and never become an HTTP response.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn get_event(repository: &dyn EventRepository, id: i64) -> Result<Event, ApiError> {
//!     repository
//!         .get_event_by_id(id)
//!         .await?
//!         .ok_or(ApiError::Event(EventError::NotFound { id }))
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Message returned when a title is already taken
pub const EVENT_IS_EXISTS: &str = "event with this title already exists";

/// Message returned when an event id is unknown
pub const EVENT_DOES_NOT_EXIST: &str = "event does not exist";

/// Message returned when the repository refuses a write
pub const EVENT_CREATE_ERROR: &str = "event could not be created";

/// The error type returned by every HTTP handler
#[derive(Debug)]
pub enum ApiError {
    /// Event CRUD errors
    Event(EventError),

    /// Authentication/authorization errors
    Request(RequestError),

    /// Input validation errors
    Validation(ValidationError),

    /// Unexpected failures (repository unavailable, poisoned lock, ...)
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Event(e) => write!(f, "{}", e),
            ApiError::Request(e) => write!(f, "{}", e),
            ApiError::Validation(e) => write!(f, "{}", e),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Event(e) => Some(e),
            ApiError::Request(e) => Some(e),
            ApiError::Validation(e) => Some(e),
            ApiError::Internal(_) => None,
        }
    }
}

/// Error body for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Event(e) => e.status_code(),
            ApiError::Request(e) => e.status_code(),
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Event(e) => e.error_code(),
            ApiError::Request(e) => e.error_code(),
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Event(EventError::AlreadyExists { title }) => {
                Some(serde_json::json!({ "title": title }))
            }
            ApiError::Event(EventError::NotFound { id })
            | ApiError::Event(EventError::DeleteMissing { id }) => {
                Some(serde_json::json!({ "id": id }))
            }
            ApiError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", err))
    }
}

// =============================================================================
// Event Errors
// =============================================================================

/// Errors related to event operations
///
/// The `Display` output is the fixed user-facing message; the fields are only
/// surfaced through [`ErrorResponse::details`] and logs.
#[derive(Debug)]
pub enum EventError {
    /// Another event already uses this title
    AlreadyExists { title: String },

    /// No event with this id
    NotFound { id: i64 },

    /// Delete of an id that does not exist (reported as a conflict)
    DeleteMissing { id: i64 },

    /// The repository refused to create the event
    CreateFailed { message: String },

    /// The repository refused to update the event
    UpdateFailed { id: i64 },
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::AlreadyExists { .. } => f.write_str(EVENT_IS_EXISTS),
            EventError::NotFound { .. } | EventError::DeleteMissing { .. } => {
                f.write_str(EVENT_DOES_NOT_EXIST)
            }
            EventError::CreateFailed { .. } | EventError::UpdateFailed { .. } => {
                f.write_str(EVENT_CREATE_ERROR)
            }
        }
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EventError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EventError::NotFound { .. } => StatusCode::NOT_FOUND,
            EventError::DeleteMissing { .. } => StatusCode::CONFLICT,
            EventError::CreateFailed { .. } => StatusCode::BAD_REQUEST,
            EventError::UpdateFailed { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EventError::AlreadyExists { .. } => "EVENT_ALREADY_EXISTS",
            EventError::NotFound { .. } | EventError::DeleteMissing { .. } => "EVENT_NOT_FOUND",
            EventError::CreateFailed { .. } => "EVENT_CREATE_FAILED",
            EventError::UpdateFailed { .. } => "EVENT_UPDATE_FAILED",
        }
    }
}

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        ApiError::Event(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to the caller's identity
#[derive(Debug)]
pub enum RequestError {
    /// Missing or unknown credentials
    Unauthorized { message: String },

    /// Authenticated, but not allowed to touch this resource
    Forbidden { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
            RequestError::Forbidden { message } => write!(f, "Forbidden: {}", message),
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::Unauthorized { .. } => "UNAUTHORIZED",
            RequestError::Forbidden { .. } => "FORBIDDEN",
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::Request(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// One or more fields failed their constraints
    FieldErrors(Vec<FieldValidationError>),

    /// Body is not valid JSON or does not match the expected shape
    InvalidJson { message: String },

    /// Query string could not be parsed
    InvalidQuery { message: String },

    /// Path id is not an integer
    InvalidId { value: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
            ValidationError::InvalidQuery { message } => {
                write!(f, "Invalid query: {}", message)
            }
            ValidationError::InvalidId { value } => {
                write!(f, "Invalid event id: '{}'", value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| FieldValidationError {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}
