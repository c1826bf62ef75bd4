//! SQLite-backed event store.
//!
//! Each append is a single `INSERT ... RETURNING` statement, so an event is
//! either fully written or not written at all. Ids come from the table's
//! `AUTOINCREMENT` column. The statement stores
//! `max(requested or now, latest created_at)`, which keeps timestamps
//! non-decreasing in id order even if the wall clock steps backwards or a
//! caller backdates an event.

use chrono::{DateTime, Utc};
use oblog_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use rusqlite::{params, Row};

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::event::{format_timestamp, Event, EventData, EventId, NewEvent, ObjectId};
use crate::store::{EventFilter, EventStore, Events};

const SELECT_COLUMNS: &str = "id, object_type, object_id, object_id_kind, event_type, \
     environment, created_at, data_json, object_copy_json";

/// Durable [`EventStore`] over a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: DbPool,
}

impl std::fmt::Debug for SqliteEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEventStore")
            .field("max_size", &self.pool.max_size())
            .finish()
    }
}

impl SqliteEventStore {
    /// Opens (creating if needed) the database described by `config` and
    /// applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the pool cannot be built or migrations fail.
    pub fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let settings = DbRuntimeSettings {
            busy_timeout_ms: config.busy_timeout_ms,
            pool_max_size: config.pool_max_size,
        };
        let pool = create_pool(&config.path, settings)?;
        tracing::info!(path = %config.path, "opened event store");
        Self::from_pool(pool)
    }

    /// Wraps an existing pool, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if no connection is available or migrations fail.
    pub fn from_pool(pool: DbPool) -> Result<Self, StoreError> {
        {
            let conn = pool.get()?;
            let applied = run_migrations(&conn)?;
            if applied > 0 {
                tracing::info!(applied, "event store schema migrated");
            }
        }
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl EventStore for SqliteEventStore {
    fn append(&self, event: NewEvent) -> Result<EventId, StoreError> {
        event.validate()?;
        let data_json = event.data.as_ref().map(serde_json::to_string).transpose()?;
        let copy_json = event
            .object_copy
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let created_at = format_timestamp(event.created_at.unwrap_or_else(Utc::now));

        let conn = self.pool.get()?;
        let id: i64 = conn.query_row(
            "INSERT INTO event_log
                (object_type, object_id, object_id_kind, event_type, environment,
                 created_at, data_json, object_copy_json)
             VALUES (
                ?1, ?2, ?3, ?4, ?5,
                MAX(
                    ?6,
                    COALESCE((SELECT created_at FROM event_log ORDER BY id DESC LIMIT 1), ?6)
                ),
                ?7, ?8
             )
             RETURNING id",
            params![
                event.object_type,
                event.object_id.to_string(),
                event.object_id.kind(),
                event.event_type,
                event.environment,
                created_at,
                data_json,
                copy_json,
            ],
            |row| row.get(0),
        )?;

        Ok(EventId(id))
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
        // Build a parameterised query dynamically. WHERE clauses and bind
        // parameters are collected separately so nothing is interpolated.
        let mut clauses = vec!["id > ?1".to_string()];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(after.map_or(0, EventId::get))];
        let mut idx = 2u32;

        if let Some(ref object_type) = filter.object_type {
            clauses.push(format!("object_type = ?{idx}"));
            param_values.push(Box::new(object_type.clone()));
            idx += 1;
        }

        if let Some(ref object_id) = filter.object_id {
            clauses.push(format!("object_id = ?{idx} AND object_id_kind = ?{}", idx + 1));
            param_values.push(Box::new(object_id.to_string()));
            param_values.push(Box::new(object_id.kind()));
            idx += 2;
        }

        if let Some(ref event_type) = filter.event_type {
            clauses.push(format!("event_type = ?{idx}"));
            param_values.push(Box::new(event_type.clone()));
            idx += 1;
        }

        if let Some(ref environment) = filter.environment {
            clauses.push(format!("environment = ?{idx}"));
            param_values.push(Box::new(environment.clone()));
            idx += 1;
        }

        let where_clause = clauses.join(" AND ");
        let sql = format!(
            "SELECT {SELECT_COLUMNS}
             FROM event_log
             WHERE {where_clause}
             ORDER BY id ASC
             LIMIT ?{idx}"
        );
        param_values.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| &**p).collect();

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_refs.as_slice(), RawEvent::from_row)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.decode()?);
        }

        Ok(events)
    }
}

/// A row as stored, before JSON and timestamp decoding.
struct RawEvent {
    id: i64,
    object_type: String,
    object_id: String,
    object_id_kind: String,
    event_type: String,
    environment: String,
    created_at: String,
    data_json: Option<String>,
    object_copy_json: Option<String>,
}

impl RawEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            object_type: row.get(1)?,
            object_id: row.get(2)?,
            object_id_kind: row.get(3)?,
            event_type: row.get(4)?,
            environment: row.get(5)?,
            created_at: row.get(6)?,
            data_json: row.get(7)?,
            object_copy_json: row.get(8)?,
        })
    }

    fn decode(self) -> Result<Event, StoreError> {
        let id = self.id;
        let corrupt = |reason: String| StoreError::Corrupt { id, reason };

        let object_id = ObjectId::from_stored(&self.object_id_kind, self.object_id)
            .ok_or_else(|| corrupt(format!("bad object id of kind '{}'", self.object_id_kind)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt(format!("bad created_at '{}': {e}", self.created_at)))?
            .with_timezone(&Utc);
        let data = self
            .data_json
            .as_deref()
            .map(serde_json::from_str::<EventData>)
            .transpose()?;
        let object_copy = self
            .object_copy_json
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()?;

        Ok(Event {
            id: EventId(id),
            object_type: self.object_type,
            object_id,
            event_type: self.event_type,
            environment: self.environment,
            created_at,
            data,
            object_copy,
        })
    }
}
