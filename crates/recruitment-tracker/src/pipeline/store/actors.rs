use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::SqliteStore;
use crate::pipeline::access::AccessLevel;
use crate::pipeline::domain::{Actor, ActorId, ActorSummary, NewActor};
use crate::pipeline::repository::{ActorRepository, RepositoryError};

const ACTOR_COLUMNS: &str = "id, full_name, email, access_level, department, created_at";

fn actor_from_row(row: &Row<'_>) -> rusqlite::Result<Actor> {
    Ok(Actor {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        access_level: row.get("access_level")?,
        department: row.get("department")?,
        created_at: row.get("created_at")?,
    })
}

fn select_actor(conn: &Connection, id: ActorId) -> rusqlite::Result<Option<Actor>> {
    conn.query_row(
        &format!("SELECT {ACTOR_COLUMNS} FROM actors WHERE id = ?1"),
        params![id],
        actor_from_row,
    )
    .optional()
}

impl ActorRepository for SqliteStore {
    fn insert_actor(
        &self,
        actor: &NewActor,
        created_at: DateTime<Utc>,
    ) -> Result<Actor, RepositoryError> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO actors (full_name, email, credential_hash, access_level, department, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                actor.full_name,
                actor.email,
                actor.credential_hash,
                actor.access_level,
                actor.department,
                created_at,
            ],
        )?;
        let id = ActorId(conn.last_insert_rowid());
        select_actor(&conn, id)?.ok_or(RepositoryError::NotFound)
    }

    fn fetch_actor(&self, id: ActorId) -> Result<Option<Actor>, RepositoryError> {
        let conn = self.get_conn()?;
        Ok(select_actor(&conn, id)?)
    }

    fn list_actors(&self) -> Result<Vec<ActorSummary>, RepositoryError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.full_name, a.email, a.access_level, a.department, a.created_at,
                    COUNT(e.id) AS evaluations_recorded
             FROM actors a
             LEFT JOIN evaluations e ON e.reviewer_id = a.id
             GROUP BY a.id
             ORDER BY a.full_name ASC, a.id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let recorded: i64 = row.get("evaluations_recorded")?;
            Ok(ActorSummary {
                actor: actor_from_row(row)?,
                evaluations_recorded: recorded.max(0) as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn set_access_level(
        &self,
        id: ActorId,
        level: AccessLevel,
    ) -> Result<Option<Actor>, RepositoryError> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE actors SET access_level = ?1 WHERE id = ?2",
            params![level, id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(select_actor(&conn, id)?)
    }

    fn delete_actor(&self, id: ActorId) -> Result<bool, RepositoryError> {
        let conn = self.get_conn()?;
        let recorded: i64 = conn.query_row(
            "SELECT COUNT(*) FROM evaluations WHERE reviewer_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if recorded > 0 {
            return Err(RepositoryError::Integrity(format!(
                "member has {recorded} recorded evaluations"
            )));
        }
        let removed = conn.execute("DELETE FROM actors WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_actor(email: &str, level: AccessLevel) -> NewActor {
        NewActor {
            full_name: "Sofia Pinto".to_string(),
            email: email.to_string(),
            access_level: level,
            department: None,
            credential_hash: Some("$argon2id$opaque".to_string()),
        }
    }

    #[test]
    fn access_level_round_trips_through_storage() {
        let store = SqliteStore::in_memory().expect("store");
        let actor = store
            .insert_actor(&new_actor("sofia@example.org", AccessLevel::Member), Utc::now())
            .expect("insert");
        let promoted = store
            .set_access_level(actor.id, AccessLevel::Admin)
            .expect("update")
            .expect("exists");
        assert_eq!(promoted.access_level, AccessLevel::Admin);
    }

    #[test]
    fn duplicate_actor_email_conflicts() {
        let store = SqliteStore::in_memory().expect("store");
        store
            .insert_actor(&new_actor("sofia@example.org", AccessLevel::Member), Utc::now())
            .expect("insert");
        let err = store
            .insert_actor(&new_actor("sofia@example.org", AccessLevel::Admin), Utc::now())
            .expect_err("duplicate");
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[test]
    fn listing_counts_recorded_evaluations() {
        let store = SqliteStore::in_memory().expect("store");
        let actor = store
            .insert_actor(&new_actor("sofia@example.org", AccessLevel::Member), Utc::now())
            .expect("insert");
        let listed = store.list_actors().expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].actor.id, actor.id);
        assert_eq!(listed[0].evaluations_recorded, 0);
        assert!(store.delete_actor(actor.id).expect("delete"));
        assert!(store.fetch_actor(actor.id).expect("fetch").is_none());
    }
}
