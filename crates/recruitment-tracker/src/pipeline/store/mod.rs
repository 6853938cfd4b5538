//! SQLite-backed implementation of the recruitment repositories.
//!
//! One connection sits behind a mutex, so statements and explicit transactions are
//! serialized. Foreign keys and the busy timeout are configured per connection.

mod actors;
mod candidates;
mod evaluations;
mod schema;
mod templates;
mod tracks;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;

use super::access::AccessLevel;
use super::domain::{ActorId, CandidateId, EvaluationId, TrackId, TrackStatus};
use super::repository::RepositoryError;
use super::stage::{Stage, UnknownStage};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Relational store for candidates, evaluations, actors, tracks and templates.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and the CLI dry runs.
    pub fn in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, RepositoryError> {
        configure_connection(&conn)?;
        schema::ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn get_conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|err| RepositoryError::Unavailable(format!("connection poisoned: {err}")))
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

macro_rules! sql_id {
    ($($id:ident),+ $(,)?) => {
        $(
            impl ToSql for $id {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.0))
                }
            }

            impl FromSql for $id {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    i64::column_result(value).map($id)
                }
            }
        )+
    };
}

sql_id!(CandidateId, ActorId, TrackId, EvaluationId);

impl ToSql for Stage {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for Stage {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        Stage::from_label(label)
            .ok_or_else(|| FromSqlError::Other(Box::new(UnknownStage(label.to_string()))))
    }
}

impl ToSql for AccessLevel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.level()))
    }
}

impl FromSql for AccessLevel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let level = value.as_i64()?;
        AccessLevel::from_level(level).ok_or(FromSqlError::OutOfRange(level))
    }
}

impl ToSql for TrackStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for TrackStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        TrackStatus::from_label(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let store = SqliteStore::in_memory().expect("open store");
        let conn = store.get_conn().expect("connection");
        schema::ensure_schema(&conn).expect("second run succeeds");
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let store = SqliteStore::in_memory().expect("open store");
        let conn = store.get_conn().expect("connection");
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("pragma");
        assert_eq!(enabled, 1);
    }

    #[test]
    fn storage_rejects_unknown_stage_labels() {
        let store = SqliteStore::in_memory().expect("open store");
        let conn = store.get_conn().expect("connection");
        let err = conn
            .execute(
                "INSERT INTO candidates (full_name, email, current_stage, created_at)
                 VALUES ('X', 'x@example.org', 'Phase 9', '2025-01-01T00:00:00Z')",
                [],
            )
            .expect_err("check constraint");
        assert!(matches!(
            RepositoryError::from(err),
            RepositoryError::Integrity(_)
        ));
    }
}
