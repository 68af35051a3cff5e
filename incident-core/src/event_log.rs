use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventType {
    Reported,
    StatusChanged,
    TransitionDenied,
    ResponderAssigned,
    LogReportUpdated,
    LogReportSubmitted,
    CommentPosted,
    MediaAttached,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    pub incident_id: String,
    pub event_type: EventType,
    pub description: String,
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

/// Append-only audit journal. Incidents are never deleted; this is the full
/// history of what happened to each one.
#[derive(Clone)]
pub struct EventLog {
    db_path: Arc<PathBuf>,
}

impl EventLog {
    pub fn open(path: &str) -> Result<Self, String> {
        let db_path = PathBuf::from(path);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
        }

        let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                incident_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                description TEXT NOT NULL,
                details TEXT,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_incident ON events(incident_id);
            CREATE INDEX IF NOT EXISTS idx_events_ts ON events(timestamp);
            ",
        )
        .map_err(|e| e.to_string())?;

        Ok(Self {
            db_path: Arc::new(db_path),
        })
    }

    pub fn append(&self, event: &Event) -> Result<i64, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let event_type = serde_json::to_string(&event.event_type).map_err(|e| e.to_string())?;
        let details = event
            .details
            .as_ref()
            .map(|d| serde_json::to_string(d).map_err(|e| e.to_string()))
            .transpose()?;

        conn.execute(
            "INSERT INTO events (incident_id, event_type, description, details, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.incident_id,
                event_type,
                event.description,
                details,
                event.timestamp,
            ],
        )
        .map_err(|e| e.to_string())?;

        Ok(conn.last_insert_rowid())
    }

    pub fn events_for_incident(&self, incident_id: &str) -> Result<Vec<Event>, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT id, incident_id, event_type, description, details, timestamp
                 FROM events
                 WHERE incident_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(|e| e.to_string())?;

        let rows = stmt
            .query_map(params![incident_id], map_row)
            .map_err(|e| e.to_string())?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(|e| e.to_string())?);
        }
        Ok(events)
    }

    /// Incremental stream used by the polling watcher.
    pub fn events_after(&self, after_id: i64) -> Result<Vec<Event>, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT id, incident_id, event_type, description, details, timestamp
                 FROM events
                 WHERE id > ?1
                 ORDER BY id ASC",
            )
            .map_err(|e| e.to_string())?;

        let rows = stmt
            .query_map(params![after_id], map_row)
            .map_err(|e| e.to_string())?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(|e| e.to_string())?);
        }
        Ok(events)
    }

    pub fn latest_event_id(&self) -> Result<Option<i64>, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        conn.query_row("SELECT MAX(id) FROM events", [], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .optional()
        .map_err(|e| e.to_string())
        .map(|v| v.flatten())
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let event_type_str: String = row.get(2)?;
    let details_str: Option<String> = row.get(4)?;

    let event_type: EventType = serde_json::from_str(&event_type_str).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(err))
    })?;

    let details = details_str
        .map(|s| {
            serde_json::from_str(&s).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(err))
            })
        })
        .transpose()?;

    Ok(Event {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        event_type,
        description: row.get(3)?,
        details,
        timestamp: row.get(5)?,
    })
}
