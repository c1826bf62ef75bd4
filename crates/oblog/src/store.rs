//! The append-only event store contract.
//!
//! A store only appends and reads. There is deliberately no update or
//! delete operation; retention is handled outside this crate.
//!
//! Reads return [`Events`], a lazy query that pages through the store by
//! id. Iterating it again starts over from the first matching event, so
//! the same query can be replayed after more events are appended.

use std::collections::VecDeque;

use crate::error::StoreError;
use crate::event::{Event, EventId, NewEvent, ObjectId};

/// Number of events fetched per page while iterating [`Events`].
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Filter criteria for reading the event log. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Filter by object type.
    pub object_type: Option<String>,
    /// Filter by object id. Only meaningful together with `object_type`.
    pub object_id: Option<ObjectId>,
    /// Filter by event type.
    pub event_type: Option<String>,
    /// Filter by environment.
    pub environment: Option<String>,
}

impl EventFilter {
    /// Events about a single object.
    pub fn for_object(object_type: &str, object_id: &ObjectId) -> Self {
        Self {
            object_type: Some(object_type.to_string()),
            object_id: Some(object_id.clone()),
            ..Default::default()
        }
    }

    /// Events of one type logged in one environment.
    pub fn for_type(event_type: &str, environment: &str) -> Self {
        Self {
            event_type: Some(event_type.to_string()),
            environment: Some(environment.to_string()),
            ..Default::default()
        }
    }

    /// Returns whether `event` satisfies every set criterion.
    pub fn matches(&self, event: &Event) -> bool {
        self.object_type
            .as_deref()
            .map_or(true, |t| t == event.object_type)
            && self
                .object_id
                .as_ref()
                .map_or(true, |id| *id == event.object_id)
            && self
                .event_type
                .as_deref()
                .map_or(true, |t| t == event.event_type)
            && self
                .environment
                .as_deref()
                .map_or(true, |e| e == event.environment)
    }
}

/// Append-only persistence for events.
///
/// Implementations must assign strictly increasing ids, reject events that
/// fail [`NewEvent`] validation before writing, and store `created_at` as
/// the later of the requested time (or now) and the latest stored one, so
/// timestamps never decrease in id order.
pub trait EventStore: Send + Sync {
    /// Persists `event` and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidEvent` for an empty object type, and
    /// another `StoreError` if the backend cannot persist the event. No
    /// retry is attempted.
    fn append(&self, event: NewEvent) -> Result<EventId, StoreError>;

    /// All events about one object, in id order.
    fn find_by_object(&self, object_type: &str, object_id: &ObjectId) -> Events<'_>;

    /// All events of one type in one environment, in id order.
    fn find_by_type(&self, event_type: &str, environment: &str) -> Events<'_>;

    /// Returns up to `limit` events matching `filter` with ids greater than
    /// `after`, in id order. This is the paging primitive behind [`Events`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn scan(
        &self,
        filter: &EventFilter,
        after: Option<EventId>,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError>;
}

/// A lazy, restartable query over an [`EventStore`].
#[derive(Clone)]
pub struct Events<'s> {
    store: &'s dyn EventStore,
    filter: EventFilter,
    page_size: usize,
}

impl std::fmt::Debug for Events<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("filter", &self.filter)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl<'s> Events<'s> {
    pub fn new(store: &'s dyn EventStore, filter: EventFilter) -> Self {
        Self {
            store,
            filter,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the page size. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Starts a fresh pass over the matching events.
    pub fn iter(&self) -> EventsIter<'s> {
        EventsIter {
            store: self.store,
            filter: self.filter.clone(),
            page_size: self.page_size,
            after: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Collects every matching event, stopping at the first error.
    pub fn fetch_all(&self) -> Result<Vec<Event>, StoreError> {
        self.iter().collect()
    }
}

impl<'a, 's> IntoIterator for &'a Events<'s> {
    type Item = Result<Event, StoreError>;
    type IntoIter = EventsIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over an [`Events`] query.
///
/// A store error is yielded once, after which the iterator is exhausted.
pub struct EventsIter<'s> {
    store: &'s dyn EventStore,
    filter: EventFilter,
    page_size: usize,
    after: Option<EventId>,
    buffer: VecDeque<Event>,
    done: bool,
}

impl Iterator for EventsIter<'_> {
    type Item = Result<Event, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            match self.store.scan(&self.filter, self.after, self.page_size) {
                Ok(page) => {
                    if page.len() < self.page_size {
                        self.done = true;
                    }
                    if let Some(last) = page.last() {
                        self.after = Some(last.id);
                    }
                    self.buffer.extend(page);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl std::iter::FusedIterator for EventsIter<'_> {}
