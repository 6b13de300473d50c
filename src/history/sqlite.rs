//! SQLite-backed search-history store.
//!
//! Backed by a single database file (default
//! `{data_dir}/sora-history.db`); in-memory databases are supported for
//! tests and ephemeral hosts.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, params};

use super::schema::{apply_schema, read_schema_version};
use super::{HistoryError, HistoryStore, NewSearchRecord, SearchRecord};
use crate::session::{Language, Persona};

/// SQLite-backed history store.
///
/// Thread-safe via an internal `Mutex<Connection>`. All writes are
/// serialized; reads also acquire the mutex for simplicity (rows are tiny
/// and queries are indexed).
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`, applying the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HistoryError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests, ephemeral hosts).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read the current schema version from the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the version row cannot be read.
    pub fn schema_version(&self) -> Result<Option<u32>, HistoryError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Acquire the connection mutex.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, HistoryError> {
        self.conn.lock().map_err(|e| HistoryError::Lock(e.to_string()))
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn record(&self, entry: NewSearchRecord) -> Result<SearchRecord, HistoryError> {
        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO search_history \
             (id, user_id, place, query, persona, language, weather_summary, suggestions, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                entry.user_id,
                entry.place,
                entry.query,
                entry.persona.as_str(),
                entry.language.as_str(),
                entry.weather_summary,
                entry.suggestions,
                created_at
            ],
        )?;

        Ok(SearchRecord {
            id,
            user_id: entry.user_id,
            place: entry.place,
            query: entry.query,
            persona: entry.persona,
            language: entry.language,
            weather_summary: entry.weather_summary,
            suggestions: entry.suggestions,
            created_at,
        })
    }

    async fn list_recent(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchRecord>, HistoryError> {
        let conn = self.lock()?;
        // rowid breaks same-second ties so the newest insert sorts first.
        let base = "SELECT id, user_id, place, query, persona, language, \
                    weather_summary, suggestions, created_at \
                    FROM search_history WHERE user_id = ?1 \
                    ORDER BY created_at DESC, rowid DESC";

        let mut records = Vec::new();
        match limit {
            Some(n) => {
                let sql = format!("{base} LIMIT ?2");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![user_id, n as i64], row_to_record)?;
                for r in rows {
                    records.push(r?);
                }
            }
            None => {
                let mut stmt = conn.prepare(base)?;
                let rows = stmt.query_map(params![user_id], row_to_record)?;
                for r in rows {
                    records.push(r?);
                }
            }
        }
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<(), HistoryError> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM search_history WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(HistoryError::NotFound(id.to_owned()));
        }
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<usize, HistoryError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM search_history WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchRecord> {
    let persona_str: String = row.get(4)?;
    let language_str: String = row.get(5)?;

    Ok(SearchRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        place: row.get(2)?,
        query: row.get(3)?,
        persona: Persona::parse(&persona_str).unwrap_or_default(),
        language: Language::parse(&language_str).unwrap_or_default(),
        weather_summary: row.get(6)?,
        suggestions: row.get(7)?,
        created_at: row.get(8)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
