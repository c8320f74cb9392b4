//! Event records and the payloads that create and modify them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A stored event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Repository-assigned id, starting at 1
    pub id: i64,

    /// Unique title
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// User that created the event
    pub owner_id: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build a new event owned by `owner_id`
    ///
    /// The id is left at 0 until a repository assigns one.
    pub fn new(owner_id: i64, title: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            description,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, bumping `updated_at`
    pub fn apply(&mut self, update: EventUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        self.updated_at = Utc::now();
    }
}

/// Title rule shared by create and update: 1 to 255 characters once trimmed
pub fn validate_title(title: &str) -> Result<(), validator::ValidationError> {
    let len = title.trim().chars().count();
    if len == 0 || len > 255 {
        return Err(validator::ValidationError::new("title_length")
            .with_message("title must be 1 to 255 characters".into()));
    }
    Ok(())
}

/// Body of `POST /events`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EventCreate {
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 4096, message = "description must be at most 4096 characters"))]
    pub description: Option<String>,
}

/// Body of `PATCH /events/{id}`; absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EventUpdate {
    #[serde(default)]
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,

    #[serde(default)]
    #[validate(length(max = 4096, message = "description must be at most 4096 characters"))]
    pub description: Option<String>,
}

/// Envelope around every successful response body
///
/// ```json
/// {"payload": {"event": {...}}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperResponse<T> {
    pub payload: Option<T>,
}

impl<T> WrapperResponse<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}

impl WrapperResponse<()> {
    /// A response with a `null` payload
    pub fn empty() -> Self {
        Self { payload: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
}
