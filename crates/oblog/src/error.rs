//! Error types for the event log.

/// Errors raised by an [`EventStore`](crate::EventStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("event store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be checked out.
    #[error("event store connection unavailable: {0}")]
    Connection(#[from] r2d2::Error),

    /// The connection pool could not be built.
    #[error("event store pool initialisation failed: {0}")]
    Pool(#[from] oblog_db::PoolError),

    /// Schema migrations failed while opening the store.
    #[error("event store migration failed: {0}")]
    Migration(#[from] oblog_db::MigrationError),

    /// JSON serialization or deserialization of a payload failed.
    #[error("event store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event was rejected before anything was written.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A stored row could not be decoded into an event.
    #[error("corrupt event row {id}: {reason}")]
    Corrupt {
        /// Row id of the offending event.
        id: i64,
        /// What could not be decoded.
        reason: String,
    },

    /// Another thread panicked while holding the store lock.
    #[error("event store lock poisoned")]
    Poisoned,
}

/// Error returned by an [`Enricher`](crate::Enricher).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct EnrichError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EnrichError {
    /// Creates an error with a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error that wraps an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors raised while registering identifier accessors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The object type label was empty.
    #[error("object type for {type_name} must not be empty")]
    EmptyObjectType {
        /// Rust type being registered.
        type_name: &'static str,
    },

    /// The Rust type was already registered under another object type.
    #[error("{type_name} is already registered as '{existing}', cannot register as '{requested}'")]
    ConflictingObjectType {
        /// Rust type being registered.
        type_name: &'static str,
        /// Object type it was first registered as.
        existing: String,
        /// Object type requested by the conflicting registration.
        requested: String,
    },

    /// The same identifier field was registered twice.
    #[error("identifier field '{field}' is already registered for '{object_type}'")]
    DuplicateField {
        /// Object type of the registration.
        object_type: String,
        /// Field name registered twice.
        field: String,
    },
}

/// Errors surfaced to callers of [`EventLogger`](crate::EventLogger).
///
/// Failures are returned unchanged; nothing is retried or suppressed, and
/// no event is persisted for a call that returns an error.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The entity's type has no registered identifier accessor.
    #[error("no identifier accessor registered for {type_name}")]
    IdentifierNotFound {
        /// Rust type name of the entity.
        type_name: &'static str,
    },

    /// More than one identifier field is registered for the entity's type.
    #[error("object type '{object_type}' has multiple identifier fields: {}", fields.join(", "))]
    MultipleIdentifiers {
        /// Object type of the entity.
        object_type: String,
        /// The registered identifier field names.
        fields: Vec<String>,
    },

    /// The enricher rejected the event.
    #[error("event enrichment failed: {0}")]
    EnrichmentFailed(#[source] EnrichError),

    /// The event store could not complete the operation.
    #[error("event store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The entity snapshot could not be serialised.
    #[error("failed to snapshot entity: {0}")]
    Snapshot(#[source] serde_json::Error),
}
