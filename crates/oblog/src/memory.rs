//! Process-local event store.

use std::sync::Mutex;

use chrono::Utc;

use crate::error::StoreError;
use crate::event::{Event, EventId, NewEvent, ObjectId};
use crate::store::{EventFilter, EventStore, Events};

/// [`EventStore`] that keeps events in memory for the life of the process.
///
/// Semantics match [`SqliteEventStore`](crate::SqliteEventStore): ids start
/// at 1 and increase by one per append, empty object types are rejected,
/// and timestamps are clamped so they never go backwards.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Poisoned` if a writer panicked.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.events.lock().map_err(|_| StoreError::Poisoned)?.len())
    }

    /// Returns `true` if no event has been appended.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Poisoned` if a writer panicked.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, event: NewEvent) -> Result<EventId, StoreError> {
        event.validate()?;
        let mut events = self.events.lock().map_err(|_| StoreError::Poisoned)?;

        let last = events.last();
        let id = EventId(last.map_or(0, |e| e.id.get()) + 1);
        let requested = event.created_at.unwrap_or_else(Utc::now);
        let created_at = last.map_or(requested, |prev| requested.max(prev.created_at));

        events.push(Event::from_new(id, created_at, event));
        Ok(id)
    }

    fn find_by_object(&self, object_type: &str, object_id: &ObjectId) -> Events<'_> {
        Events::new(self, EventFilter::for_object(object_type, object_id))
    }

    fn find_by_type(&self, event_type: &str, environment: &str) -> Events<'_> {
        Events::new(self, EventFilter::for_type(event_type, environment))
    }

    fn scan(
        &self,
        filter: &EventFilter,
        after: Option<EventId>,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let events = self.events.lock().map_err(|_| StoreError::Poisoned)?;
        // Ids are dense and start at 1, so the index of the first candidate
        // is the previous id.
        let start = after.map_or(0, |id| usize::try_from(id.get()).unwrap_or(usize::MAX));
        Ok(events
            .iter()
            .skip(start)
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }
}
