//! Search-history persistence and profile statistics.
//!
//! One collaborator interface ([`HistoryStore`]) owns all history rows;
//! the session controller only ever calls its create/list/delete
//! operations and never mutates rows directly. Statistics shown on a
//! profile view are recomputed from the full list ([`stats`]), not read
//! from a precomputed record.

mod schema;
mod sqlite;
pub mod stats;

pub use sqlite::SqliteHistoryStore;
pub use stats::{ProfileStats, aggregate};

use crate::session::{Language, Persona};
use async_trait::async_trait;

/// Input for a new history row, captured at the end of a successful cycle.
///
/// `place` is the raw user-entered place; the normalized label lives only
/// in the weather summary context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSearchRecord {
    pub user_id: String,
    pub place: String,
    pub query: String,
    pub persona: Persona,
    pub language: Language,
    pub weather_summary: String,
    pub suggestions: String,
}

/// One persisted search, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub id: String,
    pub user_id: String,
    pub place: String,
    pub query: String,
    pub persona: Persona,
    pub language: Language,
    pub weather_summary: String,
    pub suggestions: String,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

/// Errors from the history backend.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

/// Async persistence collaborator for search history.
///
/// Records are scoped per user and mutated only through these operations.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one completed search, returning the stored row.
    async fn record(&self, entry: NewSearchRecord) -> Result<SearchRecord, HistoryError>;

    /// List a user's searches, newest first. `None` lists all of them.
    async fn list_recent(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchRecord>, HistoryError>;

    /// Delete one row by id.
    ///
    /// Returns `HistoryError::NotFound` when no row matched.
    async fn delete(&self, id: &str) -> Result<(), HistoryError>;

    /// Delete all of a user's rows, returning how many were removed.
    async fn clear(&self, user_id: &str) -> Result<usize, HistoryError>;
}
