use crate::incident::Incident;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Current-value snapshots, one row per incident. Rows are only ever
/// inserted or replaced; destruction is reaching a terminal status.
#[derive(Clone)]
pub struct IncidentStore {
    db_path: Arc<PathBuf>,
}

impl IncidentStore {
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
            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status);
            ",
        )
        .map_err(|e| e.to_string())?;

        Ok(Self {
            db_path: Arc::new(db_path),
        })
    }

    pub fn insert(&self, incident: &Incident) -> Result<(), String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let body = serde_json::to_string(incident).map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO incidents (id, status, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                incident.id,
                incident.status.label(),
                body,
                incident.status_changed_at,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn put(&self, incident: &Incident) -> Result<(), String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let body = serde_json::to_string(incident).map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT OR REPLACE INTO incidents (id, status, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                incident.id,
                incident.status.label(),
                body,
                incident.status_changed_at,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Incident>, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM incidents WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.to_string())?;

        body.map(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
            .transpose()
    }

    pub fn list(&self) -> Result<Vec<Incident>, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT body FROM incidents ORDER BY updated_at DESC, id ASC")
            .map_err(|e| e.to_string())?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| e.to_string())?;

        let mut out = Vec::new();
        for row in rows {
            let body = row.map_err(|e| e.to_string())?;
            out.push(serde_json::from_str(&body).map_err(|e| e.to_string())?);
        }
        Ok(out)
    }

    pub fn list_open(&self) -> Result<Vec<Incident>, String> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|incident: &Incident| !incident.status.is_terminal())
            .collect())
    }
}
