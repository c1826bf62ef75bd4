//! Append-only event logging for domain entities.
//!
//! `oblog` records that something happened to an object (a visit, a click,
//! a print) together with the environment it happened in and an optional
//! opaque payload. Events are never updated; the store only appends and
//! reads.
//!
//! # Pipeline
//!
//! | Stage | Component | Failure |
//! |-------|-----------|---------|
//! | resolve `(object_type, object_id)` | [`IdentifierRegistry`] | `IdentifierNotFound`, `MultipleIdentifiers` |
//! | build the event | [`EventLogger`] | none |
//! | enrich the payload | [`Enricher`] | `EnrichmentFailed` |
//! | append | [`EventStore`] | `StoreUnavailable` |
//!
//! A failing stage stops the call and nothing is persisted.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oblog::{DatabaseConfig, EventLogger, IdentifierRegistry, SqliteEventStore};
//!
//! let mut identifiers = IdentifierRegistry::new();
//! identifiers.register_as::<Article, _, _>("article", "id", |a: &Article| a.id)?;
//!
//! let store = Arc::new(SqliteEventStore::open(&DatabaseConfig::default())?);
//! let logger = EventLogger::builder(store, identifiers)
//!     .environment("prod")
//!     .build()?;
//!
//! let id = logger.log_event(&article, Some(oblog::CLICK), None)?;
//! ```

mod config;
mod enricher;
mod error;
mod event;
mod identifier;
mod logger;
mod memory;
mod sqlite;
mod store;

pub use config::{
    apply_overrides, init_tracing, load_config, ConfigError, DatabaseConfig, LoggerConfig,
    LoggingConfig, OblogConfig,
};
pub use enricher::{Enricher, EnricherRegistry, EventDraft, NoopEnricher, NOOP_ENRICHER};
pub use error::{EnrichError, LogError, RegistryError, StoreError};
pub use event::{Event, EventData, EventId, NewEvent, ObjectId, ObjectRef, CLICK, PRINT, VISIT};
pub use identifier::IdentifierRegistry;
pub use logger::{EventLogger, EventLoggerBuilder};
pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;
pub use store::{EventFilter, EventStore, Events, EventsIter, DEFAULT_PAGE_SIZE};
