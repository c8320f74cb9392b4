//! Repository trait for event persistence

use crate::core::event::{Event, EventCreate, EventUpdate};
use anyhow::Result;
use async_trait::async_trait;

/// Storage for event records
///
/// Implementations decide where events live; handlers only rely on this
/// contract. Reads return `Ok(None)` for a missing record, `Err` only when the
/// storage itself fails.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Store a new event owned by `user_id` and return it with its id
    ///
    /// Fails if the title is already taken.
    async fn create_event_by_user_id(&self, user_id: i64, event: EventCreate) -> Result<Event>;

    /// Find an event by exact title
    async fn get_event_by_title(&self, title: &str) -> Result<Option<Event>>;

    /// Find an event by id
    async fn get_event_by_id(&self, id: i64) -> Result<Option<Event>>;

    /// List events ordered by id
    async fn get_events(&self, limit: usize, offset: usize) -> Result<Vec<Event>>;

    /// Apply `update` to an event owned by `user_id`
    ///
    /// Returns `None` when no such event is owned by that user.
    async fn update_event_by_id(
        &self,
        user_id: i64,
        id: i64,
        update: EventUpdate,
    ) -> Result<Option<Event>>;

    /// Delete an event owned by `user_id`; returns whether anything was removed
    async fn delete_event_by_id(&self, user_id: i64, id: i64) -> Result<bool>;
}
