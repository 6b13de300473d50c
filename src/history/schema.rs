//! SQLite DDL definitions for the search-history store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Current schema version, seeded into `schema_meta` on first open.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL for the search-history database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- WAL keeps reads open during writes.
PRAGMA journal_mode = WAL;

-- Version stamp for future migrations.
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per completed request cycle.
CREATE TABLE IF NOT EXISTS search_history (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    place           TEXT NOT NULL,      -- raw user-entered place
    query           TEXT NOT NULL,
    persona         TEXT NOT NULL,      -- lowercase Persona variant
    language        TEXT NOT NULL,      -- lowercase Language variant
    weather_summary TEXT NOT NULL,
    suggestions     TEXT NOT NULL,
    created_at      INTEGER NOT NULL DEFAULT 0
);

-- Indexes for the list-by-user, newest-first query.
CREATE INDEX IF NOT EXISTS idx_history_user_id    ON search_history(user_id);
CREATE INDEX IF NOT EXISTS idx_history_created_at ON search_history(created_at);

"#;

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times; all statements use `IF NOT EXISTS` and the
/// version stamp is only written when absent.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Read the stamped schema version.
///
/// Returns `None` when the stamp is missing or unparseable.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    use rusqlite::OptionalExtension;

    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("apply schema");
        conn
    }

    #[test]
    fn fresh_database_has_history_table_and_indexes() {
        let conn = fresh_conn();
        let names: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'index')")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");

        assert!(names.contains(&"search_history".to_owned()));
        assert!(names.contains(&"schema_meta".to_owned()));
        assert!(names.contains(&"idx_history_user_id".to_owned()));
        assert!(names.contains(&"idx_history_created_at".to_owned()));
    }

    #[test]
    fn version_stamp_is_written_once_and_survives_reapply() {
        let conn = fresh_conn();
        assert_eq!(
            read_schema_version(&conn).expect("read"),
            Some(CURRENT_SCHEMA_VERSION)
        );

        // A bumped version must survive re-running the DDL.
        conn.execute(
            "UPDATE schema_meta SET value = '999' WHERE key = 'schema_version'",
            [],
        )
        .expect("bump");
        apply_schema(&conn).expect("reapply");
        assert_eq!(read_schema_version(&conn).expect("read"), Some(999));
    }

    #[test]
    fn unparseable_version_reads_as_none() {
        let conn = fresh_conn();
        conn.execute(
            "UPDATE schema_meta SET value = 'not-a-number' WHERE key = 'schema_version'",
            [],
        )
        .expect("corrupt stamp");
        assert_eq!(read_schema_version(&conn).expect("read"), None);
    }
}
