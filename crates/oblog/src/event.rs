//! Event record types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Opaque payload attached to an event. Never interpreted by the core.
pub type EventData = serde_json::Map<String, serde_json::Value>;

/// Event type used when the caller does not supply one.
pub const VISIT: &str = "visit";
/// Event type for clicks.
pub const CLICK: &str = "click";
/// Event type for prints.
pub const PRINT: &str = "print";

/// Store-assigned event identifier. Strictly increasing in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl EventId {
    /// Returns the raw integer id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the object an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    /// Integer key, e.g. an auto-increment primary key.
    Int(i64),
    /// String key, e.g. a slug or UUID.
    Text(String),
}

impl ObjectId {
    /// Storage discriminator for this variant.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Text(_) => "text",
        }
    }

    /// Rebuilds an id from its stored text and discriminator.
    pub(crate) fn from_stored(kind: &str, value: String) -> Option<Self> {
        match kind {
            "int" => value.parse().ok().map(Self::Int),
            "text" => Some(Self::Text(value)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ObjectId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ObjectId {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ObjectId {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<String> for ObjectId {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for ObjectId {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A resolved `(object_type, object_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Kind of object, e.g. `article`.
    pub object_type: String,
    /// Identifier of the object within its type.
    pub object_id: ObjectId,
}

/// An event ready to be appended to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Kind of object the event is about. Must not be empty.
    pub object_type: String,
    /// Identifier of the object.
    pub object_id: ObjectId,
    /// Event tag, e.g. `visit`, `click`, `print`.
    pub event_type: String,
    /// Environment of the logger that produced the event.
    pub environment: String,
    /// Requested creation time. The store assigns one when unset, and
    /// raises it to the latest stored timestamp when it is earlier.
    pub created_at: Option<DateTime<Utc>>,
    /// Optional opaque payload.
    pub data: Option<EventData>,
    /// Optional JSON snapshot of the object at logging time.
    pub object_copy: Option<serde_json::Value>,
}

impl NewEvent {
    /// Creates an event with no payload and no timestamp.
    pub fn new(
        object: ObjectRef,
        event_type: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object.object_type,
            object_id: object.object_id,
            event_type: event_type.into(),
            environment: environment.into(),
            created_at: None,
            data: None,
            object_copy: None,
        }
    }

    /// Attaches a payload.
    pub fn with_data(mut self, data: Option<EventData>) -> Self {
        self.data = data;
        self
    }

    /// Attaches an object snapshot.
    pub fn with_object_copy(mut self, copy: serde_json::Value) -> Self {
        self.object_copy = Some(copy);
        self
    }

    /// Requests a creation time instead of letting the store assign one.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Checks the fields every store requires before it writes anything.
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.object_type.is_empty() {
            return Err(StoreError::InvalidEvent(
                "object type must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A persisted event. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned id.
    pub id: EventId,
    /// Kind of object the event is about.
    pub object_type: String,
    /// Identifier of the object.
    pub object_id: ObjectId,
    /// Event tag.
    pub event_type: String,
    /// Environment of the logger that produced the event.
    pub environment: String,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Optional opaque payload.
    pub data: Option<EventData>,
    /// Optional JSON snapshot of the object at logging time.
    pub object_copy: Option<serde_json::Value>,
}

impl Event {
    pub(crate) fn from_new(id: EventId, created_at: DateTime<Utc>, event: NewEvent) -> Self {
        Self {
            id,
            object_type: event.object_type,
            object_id: event.object_id,
            event_type: event.event_type,
            environment: event.environment,
            created_at,
            data: event.data,
            object_copy: event.object_copy,
        }
    }

    /// Returns the object type without any leading module path.
    ///
    /// `shop::catalog::Product` becomes `Product`; plain labels are
    /// returned unchanged.
    pub fn short_object_type(&self) -> &str {
        short_type_name(&self.object_type)
    }

    /// Returns the object reference this event is about.
    pub fn object(&self) -> ObjectRef {
        ObjectRef {
            object_type: self.object_type.clone(),
            object_id: self.object_id.clone(),
        }
    }
}

pub(crate) fn short_type_name(name: &str) -> &str {
    // Generic arguments may contain paths of their own.
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

/// Formats a timestamp the way stores persist it.
///
/// Fixed-width microsecond precision keeps lexical and chronological order
/// identical, which the SQLite store relies on.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_type_name_strips_module_path() {
        assert_eq!(short_type_name("shop::catalog::Product"), "Product");
        assert_eq!(short_type_name("article"), "article");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper<b::Inner>");
    }

    #[test]
    fn object_id_survives_storage_encoding() {
        let int = ObjectId::Int(42);
        assert_eq!(
            ObjectId::from_stored(int.kind(), int.to_string()),
            Some(int)
        );

        let text = ObjectId::Text("42".to_string());
        assert_eq!(
            ObjectId::from_stored(text.kind(), text.to_string()),
            Some(text)
        );

        assert_eq!(ObjectId::from_stored("int", "nope".to_string()), None);
        assert_eq!(ObjectId::from_stored("uuid", "x".to_string()), None);
    }

    #[test]
    fn object_id_serialises_untagged() {
        assert_eq!(
            serde_json::to_value(ObjectId::Int(7)).expect("serialise"),
            serde_json::json!(7)
        );
        assert_eq!(
            serde_json::to_value(ObjectId::from("slug")).expect("serialise"),
            serde_json::json!("slug")
        );
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let a = "2024-01-01T00:00:00Z"
            .parse::<DateTime<Utc>>()
            .expect("parse");
        let b = "2024-01-01T00:00:00.5Z"
            .parse::<DateTime<Utc>>()
            .expect("parse");
        let (fa, fb) = (format_timestamp(a), format_timestamp(b));
        assert_eq!(fa, "2024-01-01T00:00:00.000000Z");
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
    }
}
