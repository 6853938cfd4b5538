use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::SqliteStore;
use crate::pipeline::domain::{Track, TrackId, TrackStatus};
use crate::pipeline::repository::{RepositoryError, TrackRepository};

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get("id")?,
        name: row.get("name")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
    })
}

fn select_track(conn: &Connection, id: TrackId) -> rusqlite::Result<Option<Track>> {
    conn.query_row(
        "SELECT id, name, status, created_at FROM tracks WHERE id = ?1",
        params![id],
        track_from_row,
    )
    .optional()
}

fn archive_all(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE tracks SET status = ?1 WHERE status = ?2",
        params![TrackStatus::Archived, TrackStatus::Active],
    )
}

impl TrackRepository for SqliteStore {
    fn create_active_track(
        &self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Track, RepositoryError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        archive_all(&tx)?;
        tx.execute(
            "INSERT INTO tracks (name, status, created_at) VALUES (?1, ?2, ?3)",
            params![name, TrackStatus::Active, created_at],
        )?;
        let id = TrackId(tx.last_insert_rowid());
        let track = select_track(&tx, id)?.ok_or(RepositoryError::NotFound)?;

        tx.commit()?;
        Ok(track)
    }

    fn activate_track(&self, id: TrackId) -> Result<Option<Track>, RepositoryError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if select_track(&tx, id)?.is_none() {
            return Ok(None);
        }
        archive_all(&tx)?;
        tx.execute(
            "UPDATE tracks SET status = ?1 WHERE id = ?2",
            params![TrackStatus::Active, id],
        )?;
        let track = select_track(&tx, id)?;

        tx.commit()?;
        Ok(track)
    }

    fn fetch_track(&self, id: TrackId) -> Result<Option<Track>, RepositoryError> {
        let conn = self.get_conn()?;
        Ok(select_track(&conn, id)?)
    }

    fn delete_track(&self, id: TrackId) -> Result<bool, RepositoryError> {
        let conn = self.get_conn()?;
        let referencing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM candidates WHERE track_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if referencing > 0 {
            return Err(RepositoryError::Integrity(format!(
                "track is referenced by {referencing} candidates"
            )));
        }
        let removed = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn list_tracks(&self) -> Result<Vec<Track>, RepositoryError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, status, created_at FROM tracks ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], track_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(tracks: &[Track]) -> Vec<TrackId> {
        tracks
            .iter()
            .filter(|track| track.status == TrackStatus::Active)
            .map(|track| track.id)
            .collect()
    }

    #[test]
    fn creating_a_track_archives_the_previous_one() {
        let store = SqliteStore::in_memory().expect("store");
        let spring = store.create_active_track("Spring 2025", Utc::now()).expect("create");
        let autumn = store.create_active_track("Autumn 2025", Utc::now()).expect("create");

        let tracks = store.list_tracks().expect("list");
        assert_eq!(active(&tracks), vec![autumn.id]);
        assert_eq!(tracks.len(), 2);
        assert_ne!(spring.id, autumn.id);
    }

    #[test]
    fn activation_leaves_exactly_one_active() {
        let store = SqliteStore::in_memory().expect("store");
        let a = store.create_active_track("A", Utc::now()).expect("create");
        store.create_active_track("B", Utc::now()).expect("create");

        let activated = store
            .activate_track(a.id)
            .expect("activate")
            .expect("exists");
        assert_eq!(activated.status, TrackStatus::Active);
        assert_eq!(active(&store.list_tracks().expect("list")), vec![a.id]);
        assert!(store.activate_track(TrackId(77)).expect("activate").is_none());
    }

    #[test]
    fn index_rejects_a_second_active_track() {
        let store = SqliteStore::in_memory().expect("store");
        store.create_active_track("A", Utc::now()).expect("create");
        let conn = store.get_conn().expect("connection");
        let err = conn
            .execute(
                "INSERT INTO tracks (name, status, created_at) VALUES ('B', 'active', '2025-01-01')",
                [],
            )
            .expect_err("partial unique index");
        assert!(matches!(
            RepositoryError::from(err),
            RepositoryError::Conflict(_)
        ));
    }
}
