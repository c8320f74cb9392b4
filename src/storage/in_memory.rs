//! In-memory implementation of EventRepository for testing and development

use crate::core::event::{Event, EventCreate, EventUpdate};
use crate::core::repository::EventRepository;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory event repository
///
/// Events are kept in id order. Uses RwLock for thread-safe access; the title
/// uniqueness check and the insert happen under the same write lock.
#[derive(Clone)]
pub struct InMemoryEventRepository {
    events: Arc<RwLock<BTreeMap<i64, Event>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryEventRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.events.read().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEventRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn create_event_by_user_id(&self, user_id: i64, event: EventCreate) -> Result<Event> {
        let mut events = self
            .events
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if events.values().any(|existing| existing.title == event.title) {
            bail!("title '{}' is already taken", event.title);
        }

        let mut stored = Event::new(user_id, event.title, event.description);
        stored.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        events.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn get_event_by_title(&self, title: &str) -> Result<Option<Event>> {
        let events = self
            .events
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(events.values().find(|event| event.title == title).cloned())
    }

    async fn get_event_by_id(&self, id: i64) -> Result<Option<Event>> {
        let events = self
            .events
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(events.get(&id).cloned())
    }

    async fn get_events(&self, limit: usize, offset: usize) -> Result<Vec<Event>> {
        let events = self
            .events
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(events.values().skip(offset).take(limit).cloned().collect())
    }

    async fn update_event_by_id(
        &self,
        user_id: i64,
        id: i64,
        update: EventUpdate,
    ) -> Result<Option<Event>> {
        let mut events = self
            .events
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if let Some(title) = update.title.as_deref()
            && events
                .values()
                .any(|existing| existing.id != id && existing.title == title)
        {
            bail!("title '{}' is already taken", title);
        }

        let Some(event) = events.get_mut(&id).filter(|e| e.owner_id == user_id) else {
            return Ok(None);
        };
        event.apply(update);

        Ok(Some(event.clone()))
    }

    async fn delete_event_by_id(&self, user_id: i64, id: i64) -> Result<bool> {
        let mut events = self
            .events
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if events.get(&id).is_some_and(|e| e.owner_id == user_id) {
            events.remove(&id);
            return Ok(true);
        }

        Ok(false)
    }
}
