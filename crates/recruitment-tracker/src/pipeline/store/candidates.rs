use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::SqliteStore;
use crate::pipeline::domain::{
    ActorId, Candidate, CandidateFilter, CandidateId, CandidatePatch, CandidateSummary,
    NewCandidate, PipelineStats, StageCount,
};
use crate::pipeline::lock::LockSnapshot;
use crate::pipeline::repository::{CandidateRepository, RepositoryError};
use crate::pipeline::roster::{ImportSummary, RosterRow};
use crate::pipeline::stage::Stage;

const CANDIDATE_COLUMNS: &str = "id, full_name, email, phone, degree_type, current_stage, \
     evaluation_notes, intermediate_decision, final_decision, private_admin_notes, \
     track_id, locked_by, locked_at, created_at";

fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<Candidate> {
    Ok(Candidate {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        degree_type: row.get("degree_type")?,
        current_stage: row.get("current_stage")?,
        evaluation_notes: row.get("evaluation_notes")?,
        intermediate_decision: row.get("intermediate_decision")?,
        final_decision: row.get("final_decision")?,
        private_admin_notes: row.get("private_admin_notes")?,
        track_id: row.get("track_id")?,
        locked_by: row.get("locked_by")?,
        locked_at: row.get("locked_at")?,
        created_at: row.get("created_at")?,
    })
}

pub(super) fn select_candidate(
    conn: &Connection,
    id: CandidateId,
) -> rusqlite::Result<Option<Candidate>> {
    conn.query_row(
        &format!("SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ?1"),
        params![id],
        candidate_from_row,
    )
    .optional()
}

impl CandidateRepository for SqliteStore {
    fn insert_candidate(
        &self,
        candidate: &NewCandidate,
        created_at: DateTime<Utc>,
    ) -> Result<Candidate, RepositoryError> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO candidates (full_name, email, phone, degree_type, current_stage, track_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                candidate.full_name,
                candidate.email,
                candidate.phone,
                candidate.degree_type,
                Stage::default(),
                candidate.track_id,
                created_at,
            ],
        )?;
        let id = CandidateId(conn.last_insert_rowid());
        select_candidate(&conn, id)?.ok_or(RepositoryError::NotFound)
    }

    fn fetch_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        let conn = self.get_conn()?;
        Ok(select_candidate(&conn, id)?)
    }

    fn list_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateSummary>, RepositoryError> {
        let conn = self.get_conn()?;
        let degree = filter.degree_filter();
        let mut sql = String::from(
            "SELECT id, full_name, email, phone, degree_type, current_stage, track_id \
             FROM candidates WHERE 1 = 1",
        );
        let mut values: Vec<&dyn ToSql> = Vec::new();

        if let Some(stage) = filter.stage.as_ref() {
            values.push(stage);
            sql.push_str(&format!(" AND current_stage = ?{}", values.len()));
        }
        if let Some(degree) = degree.as_ref() {
            values.push(degree);
            sql.push_str(&format!(" AND degree_type = ?{}", values.len()));
        }
        if let Some(track) = filter.track.as_ref() {
            values.push(track);
            sql.push_str(&format!(" AND track_id = ?{}", values.len()));
        }
        sql.push_str(&format!(
            " ORDER BY {} {}, id ASC",
            filter.sort.column(),
            filter.order.keyword()
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(values.as_slice(), |row| {
            Ok(CandidateSummary {
                id: row.get("id")?,
                full_name: row.get("full_name")?,
                email: row.get("email")?,
                phone: row.get("phone")?,
                degree_type: row.get("degree_type")?,
                current_stage: row.get("current_stage")?,
                track_id: row.get("track_id")?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_candidate(
        &self,
        id: CandidateId,
        patch: &CandidatePatch,
    ) -> Result<Option<Candidate>, RepositoryError> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE candidates SET
                full_name = COALESCE(?1, full_name),
                email = COALESCE(?2, email),
                phone = COALESCE(?3, phone),
                degree_type = COALESCE(?4, degree_type),
                current_stage = COALESCE(?5, current_stage),
                evaluation_notes = COALESCE(?6, evaluation_notes),
                intermediate_decision = COALESCE(?7, intermediate_decision),
                final_decision = COALESCE(?8, final_decision),
                private_admin_notes = COALESCE(?9, private_admin_notes),
                track_id = COALESCE(?10, track_id)
             WHERE id = ?11",
            params![
                patch.full_name,
                patch.email,
                patch.phone,
                patch.degree_type,
                patch.current_stage,
                patch.evaluation_notes,
                patch.intermediate_decision,
                patch.final_decision,
                patch.private_admin_notes,
                patch.track_id,
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(select_candidate(&conn, id)?)
    }

    fn set_stage(&self, id: CandidateId, stage: Stage) -> Result<bool, RepositoryError> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE candidates SET current_stage = ?1 WHERE id = ?2",
            params![stage, id],
        )?;
        Ok(changed > 0)
    }

    fn lock_snapshot(&self, id: CandidateId) -> Result<Option<LockSnapshot>, RepositoryError> {
        let conn = self.get_conn()?;
        let snapshot = conn
            .query_row(
                "SELECT c.locked_by, c.locked_at, a.full_name
                 FROM candidates c
                 LEFT JOIN actors a ON a.id = c.locked_by
                 WHERE c.id = ?1",
                params![id],
                |row| {
                    Ok(LockSnapshot {
                        locked_by: row.get(0)?,
                        locked_at: row.get(1)?,
                        holder_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(snapshot)
    }

    fn write_lock(
        &self,
        id: CandidateId,
        actor: ActorId,
        locked_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE candidates SET locked_by = ?1, locked_at = ?2 WHERE id = ?3",
            params![actor, locked_at, id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn delete_candidates(&self, ids: &[CandidateId]) -> Result<usize, RepositoryError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut removed = 0;

        for id in ids {
            tx.execute(
                "DELETE FROM evaluations WHERE candidate_id = ?1",
                params![id],
            )?;
            removed += tx.execute("DELETE FROM candidates WHERE id = ?1", params![id])?;
        }

        tx.commit()?;
        Ok(removed)
    }

    fn stage_counts(&self) -> Result<PipelineStats, RepositoryError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT current_stage, COUNT(*) FROM candidates GROUP BY current_stage",
        )?;
        let counted = stmt
            .query_map([], |row| Ok((row.get::<_, Stage>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let stages: Vec<StageCount> = Stage::ALL
            .into_iter()
            .map(|stage| StageCount {
                stage,
                count: counted
                    .iter()
                    .find(|(counted_stage, _)| *counted_stage == stage)
                    .map(|(_, count)| (*count).max(0) as u64)
                    .unwrap_or(0),
            })
            .collect();
        let total = stages.iter().map(|entry| entry.count).sum();

        Ok(PipelineStats { total, stages })
    }

    fn upsert_roster(
        &self,
        rows: &[RosterRow],
        created_at: DateTime<Utc>,
    ) -> Result<ImportSummary, RepositoryError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut summary = ImportSummary::default();

        for row in rows {
            let existing: Option<CandidateId> = tx
                .query_row(
                    "SELECT id FROM candidates WHERE email = ?1",
                    params![row.email],
                    |r| r.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE candidates SET phone = ?1, degree_type = ?2 WHERE id = ?3",
                        params![row.phone, row.degree_type, id],
                    )?;
                    summary.updated += 1;
                }
                None => {
                    tx.execute(
                        "INSERT INTO candidates (full_name, email, phone, degree_type, current_stage, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            row.name,
                            row.email,
                            row.phone,
                            row.degree_type,
                            Stage::default(),
                            created_at,
                        ],
                    )?;
                    summary.inserted += 1;
                }
            }
            summary.processed += 1;
        }

        tx.commit()?;
        Ok(summary)
    }

    fn candidates_in_stage(&self, stage: Stage) -> Result<Vec<Candidate>, RepositoryError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE current_stage = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![stage], candidate_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
