//! Pluggable per-event enrichment.
//!
//! An [`Enricher`] runs after the logger has fixed an event's object,
//! type and environment, and before the event reaches the store. It only
//! sees an [`EventDraft`], which exposes those fields read-only and lets
//! the enricher touch nothing but the payload.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EnrichError;
use crate::event::{EventData, NewEvent, ObjectId};

/// Name under which [`NoopEnricher`] is always registered.
pub const NOOP_ENRICHER: &str = "noop";

/// An event under construction, as seen by an [`Enricher`].
#[derive(Debug, Clone)]
pub struct EventDraft {
    event: NewEvent,
}

impl EventDraft {
    pub(crate) fn new(event: NewEvent) -> Self {
        Self { event }
    }

    pub(crate) fn into_event(self) -> NewEvent {
        self.event
    }

    /// Kind of object the event is about.
    pub fn object_type(&self) -> &str {
        &self.event.object_type
    }

    /// Identifier of the object.
    pub fn object_id(&self) -> &ObjectId {
        &self.event.object_id
    }

    /// Event tag chosen by the logger.
    pub fn event_type(&self) -> &str {
        &self.event.event_type
    }

    /// Environment of the logger that built the event.
    pub fn environment(&self) -> &str {
        &self.event.environment
    }

    /// The payload, if any.
    pub fn data(&self) -> Option<&EventData> {
        self.event.data.as_ref()
    }

    /// Mutable access to the payload, creating an empty one if absent.
    pub fn data_mut(&mut self) -> &mut EventData {
        self.event.data.get_or_insert_with(EventData::new)
    }

    /// Inserts a single payload entry, returning the value it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.data_mut().insert(key.into(), value.into())
    }

    /// Replaces the payload wholesale.
    pub fn set_data(&mut self, data: Option<EventData>) {
        self.event.data = data;
    }
}

/// Hook that augments an event before it is persisted.
///
/// Returning an error aborts the logging call; the event is not stored.
pub trait Enricher: Send + Sync {
    fn enrich(&self, draft: &mut EventDraft) -> Result<(), EnrichError>;
}

impl<F> Enricher for F
where
    F: Fn(&mut EventDraft) -> Result<(), EnrichError> + Send + Sync,
{
    fn enrich(&self, draft: &mut EventDraft) -> Result<(), EnrichError> {
        self(draft)
    }
}

/// Enricher that leaves every event untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

impl Enricher for NoopEnricher {
    fn enrich(&self, _draft: &mut EventDraft) -> Result<(), EnrichError> {
        Ok(())
    }
}

/// Named enrichers that configuration can select from.
#[derive(Clone)]
pub struct EnricherRegistry {
    enrichers: HashMap<String, Arc<dyn Enricher>>,
}

impl Default for EnricherRegistry {
    fn default() -> Self {
        let mut enrichers: HashMap<String, Arc<dyn Enricher>> = HashMap::new();
        enrichers.insert(NOOP_ENRICHER.to_string(), Arc::new(NoopEnricher));
        Self { enrichers }
    }
}

impl std::fmt::Debug for EnricherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.enrichers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EnricherRegistry")
            .field("names", &names)
            .finish()
    }
}

impl EnricherRegistry {
    /// Creates a registry holding only [`NoopEnricher`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an enricher under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, enricher: Arc<dyn Enricher>) -> &mut Self {
        self.enrichers.insert(name.into(), enricher);
        self
    }

    /// Looks up an enricher by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Enricher>> {
        self.enrichers.get(name).cloned()
    }
}
