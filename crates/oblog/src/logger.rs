//! The event logging pipeline.
//!
//! Each call runs resolve → build → enrich → append and either returns the
//! new event id or fails without having written anything. The logger keeps
//! no state between calls beyond what it captured at construction, so a
//! single instance can be shared across threads.

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ConfigError, LoggerConfig};
use crate::enricher::{Enricher, EnricherRegistry, EventDraft, NoopEnricher};
use crate::error::LogError;
use crate::event::{EventData, EventId, NewEvent, VISIT};
use crate::identifier::IdentifierRegistry;
use crate::store::{EventStore, Events};

/// Records events about registered entities.
pub struct EventLogger {
    environment: String,
    default_event_type: String,
    identifiers: IdentifierRegistry,
    enricher: Arc<dyn Enricher>,
    store: Arc<dyn EventStore>,
}

impl std::fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLogger")
            .field("environment", &self.environment)
            .field("default_event_type", &self.default_event_type)
            .field("identifiers", &self.identifiers)
            .finish_non_exhaustive()
    }
}

impl EventLogger {
    /// Starts building a logger over `store`.
    pub fn builder(store: Arc<dyn EventStore>, identifiers: IdentifierRegistry) -> EventLoggerBuilder {
        EventLoggerBuilder {
            store,
            identifiers,
            environment: LoggerConfig::default().environment,
            default_event_type: VISIT.to_string(),
            enricher: Arc::new(NoopEnricher),
        }
    }

    /// Builds a logger from configuration, picking the enricher by name
    /// from `enrichers`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownEnricher` if the configured enricher is
    /// not registered, or an emptiness error for blank settings.
    pub fn from_config(
        config: &LoggerConfig,
        store: Arc<dyn EventStore>,
        identifiers: IdentifierRegistry,
        enrichers: &EnricherRegistry,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::builder(store, identifiers)
            .environment(config.environment.clone())
            .default_event_type(config.default_event_type.clone());

        if let Some(name) = config.enricher.as_deref() {
            let enricher = enrichers
                .get(name)
                .ok_or_else(|| ConfigError::UnknownEnricher(name.to_string()))?;
            builder = builder.enricher(enricher);
        }

        builder.build()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn default_event_type(&self) -> &str {
        &self.default_event_type
    }

    pub fn identifiers(&self) -> &IdentifierRegistry {
        &self.identifiers
    }

    pub fn store(&self) -> &dyn EventStore {
        self.store.as_ref()
    }

    /// Logs a default-type event with no payload.
    ///
    /// # Errors
    ///
    /// See [`log_event`](Self::log_event).
    pub fn log<T: Any>(&self, entity: &T) -> Result<EventId, LogError> {
        self.log_event(entity, None, None)
    }

    /// Logs an event about `entity`.
    ///
    /// `event_type` falls back to the configured default when `None`.
    /// `data` is stored verbatim.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error unchanged:
    /// `IdentifierNotFound`/`MultipleIdentifiers`, `EnrichmentFailed`, or
    /// `StoreUnavailable`. Nothing is persisted on error.
    pub fn log_event<T: Any>(
        &self,
        entity: &T,
        event_type: Option<&str>,
        data: Option<EventData>,
    ) -> Result<EventId, LogError> {
        let event = self.build(entity, event_type, data)?;
        self.persist(event)
    }

    /// Like [`log_event`](Self::log_event), additionally storing a JSON
    /// snapshot of `entity` with the event.
    ///
    /// # Errors
    ///
    /// Returns `LogError::Snapshot` if `entity` cannot be serialised, and
    /// otherwise the same errors as `log_event`.
    pub fn log_with_snapshot<T: Any + Serialize>(
        &self,
        entity: &T,
        event_type: Option<&str>,
        data: Option<EventData>,
    ) -> Result<EventId, LogError> {
        let event = self.build(entity, event_type, data)?;
        let copy = serde_json::to_value(entity).map_err(LogError::Snapshot)?;
        self.persist(event.with_object_copy(copy))
    }

    /// All events recorded about `entity`, oldest first.
    ///
    /// # Errors
    ///
    /// Fails like identifier resolution in `log_event`.
    pub fn history<T: Any>(&self, entity: &T) -> Result<Events<'_>, LogError> {
        let object = self.identifiers.resolve(entity)?;
        Ok(self
            .store
            .find_by_object(&object.object_type, &object.object_id))
    }

    fn build<T: Any>(
        &self,
        entity: &T,
        event_type: Option<&str>,
        data: Option<EventData>,
    ) -> Result<NewEvent, LogError> {
        let object = self.identifiers.resolve(entity)?;
        let event_type = event_type.unwrap_or(self.default_event_type.as_str());
        Ok(NewEvent::new(object, event_type, self.environment.as_str()).with_data(data))
    }

    fn persist(&self, event: NewEvent) -> Result<EventId, LogError> {
        let mut draft = EventDraft::new(event);
        if let Err(e) = self.enricher.enrich(&mut draft) {
            tracing::warn!(
                object_type = draft.object_type(),
                object_id = %draft.object_id(),
                event_type = draft.event_type(),
                error = %e,
                "event enrichment failed, event not recorded"
            );
            return Err(LogError::EnrichmentFailed(e));
        }
        let event = draft.into_event();

        let object_type = event.object_type.clone();
        let event_type = event.event_type.clone();
        match self.store.append(event) {
            Ok(id) => {
                tracing::debug!(
                    %id,
                    object_type = %object_type,
                    event_type = %event_type,
                    environment = %self.environment,
                    "event recorded"
                );
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(
                    object_type = %object_type,
                    event_type = %event_type,
                    error = %e,
                    "event store append failed"
                );
                Err(LogError::StoreUnavailable(e))
            }
        }
    }
}

/// Builder for [`EventLogger`].
pub struct EventLoggerBuilder {
    store: Arc<dyn EventStore>,
    identifiers: IdentifierRegistry,
    environment: String,
    default_event_type: String,
    enricher: Arc<dyn Enricher>,
}

impl EventLoggerBuilder {
    /// Sets the environment tag applied to every event.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sets the event type used when a call does not supply one.
    pub fn default_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.default_event_type = event_type.into();
        self
    }

    /// Replaces the no-op enricher.
    pub fn enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    /// Finishes the logger.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the environment or default event type is
    /// empty.
    pub fn build(self) -> Result<EventLogger, ConfigError> {
        if self.environment.is_empty() {
            return Err(ConfigError::EmptyEnvironment);
        }
        if self.default_event_type.is_empty() {
            return Err(ConfigError::EmptyDefaultEventType);
        }

        Ok(EventLogger {
            environment: self.environment,
            default_event_type: self.default_event_type,
            identifiers: self.identifiers,
            enricher: self.enricher,
            store: self.store,
        })
    }
}
