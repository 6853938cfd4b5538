use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::SqliteStore;
use crate::pipeline::domain::{CandidateId, EvaluationId};
use crate::pipeline::ledger::{EvaluationEntry, NewEvaluation};
use crate::pipeline::repository::{EvaluationRepository, RepositoryError};
use crate::pipeline::stage::Stage;

const ENTRY_QUERY: &str = "SELECT e.id, e.candidate_id, e.reviewer_id, a.full_name, a.department, \
     a.access_level, e.score, e.feedback, e.stage_evaluated, e.created_at \
     FROM evaluations e JOIN actors a ON a.id = e.reviewer_id";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<EvaluationEntry> {
    Ok(EvaluationEntry {
        id: row.get(0)?,
        candidate_id: row.get(1)?,
        reviewer_id: row.get(2)?,
        reviewer_name: row.get(3)?,
        reviewer_department: row.get(4)?,
        reviewer_access_level: row.get(5)?,
        score: row.get(6)?,
        feedback: row.get(7)?,
        stage_evaluated: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn insert_entry(
    conn: &Connection,
    evaluation: &NewEvaluation,
    created_at: DateTime<Utc>,
) -> rusqlite::Result<EvaluationEntry> {
    conn.execute(
        "INSERT INTO evaluations (candidate_id, reviewer_id, score, feedback, stage_evaluated, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            evaluation.candidate_id,
            evaluation.reviewer_id,
            evaluation.score,
            evaluation.feedback,
            evaluation.stage_evaluated,
            created_at,
        ],
    )?;
    let id = EvaluationId(conn.last_insert_rowid());
    conn.query_row(
        &format!("{ENTRY_QUERY} WHERE e.id = ?1"),
        params![id],
        entry_from_row,
    )
}

impl EvaluationRepository for SqliteStore {
    fn append_evaluation(
        &self,
        evaluation: &NewEvaluation,
        created_at: DateTime<Utc>,
    ) -> Result<EvaluationEntry, RepositoryError> {
        let conn = self.get_conn()?;
        Ok(insert_entry(&conn, evaluation, created_at)?)
    }

    fn append_and_advance(
        &self,
        evaluation: &NewEvaluation,
        stage: Stage,
        created_at: DateTime<Utc>,
    ) -> Result<EvaluationEntry, RepositoryError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let moved = tx.execute(
            "UPDATE candidates SET current_stage = ?1 WHERE id = ?2",
            params![stage, evaluation.candidate_id],
        )?;
        if moved == 0 {
            return Err(RepositoryError::NotFound);
        }
        let entry = insert_entry(&tx, evaluation, created_at)?;

        tx.commit()?;
        Ok(entry)
    }

    fn evaluation_history(
        &self,
        candidate: CandidateId,
    ) -> Result<Vec<EvaluationEntry>, RepositoryError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{ENTRY_QUERY} WHERE e.candidate_id = ?1 ORDER BY e.created_at DESC, e.id DESC"
        ))?;
        let rows = stmt.query_map(params![candidate], entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::access::AccessLevel;
    use crate::pipeline::domain::{ActorId, NewActor, NewCandidate};
    use crate::pipeline::repository::{ActorRepository, CandidateRepository};
    use chrono::Duration;

    fn seeded() -> (SqliteStore, CandidateId, ActorId) {
        let store = SqliteStore::in_memory().expect("store");
        let candidate = store
            .insert_candidate(
                &NewCandidate {
                    full_name: "Marta Lopes".to_string(),
                    email: "marta@example.org".to_string(),
                    phone: None,
                    degree_type: None,
                    track_id: None,
                },
                Utc::now(),
            )
            .expect("candidate");
        let reviewer = store
            .insert_actor(
                &NewActor {
                    full_name: "Hugo Neves".to_string(),
                    email: "hugo@example.org".to_string(),
                    access_level: AccessLevel::Evaluator,
                    department: Some("HR".to_string()),
                    credential_hash: None,
                },
                Utc::now(),
            )
            .expect("actor");
        (store, candidate.id, reviewer.id)
    }

    fn evaluation(candidate: CandidateId, reviewer: ActorId, score: u8) -> NewEvaluation {
        NewEvaluation {
            candidate_id: candidate,
            reviewer_id: reviewer,
            score,
            feedback: "Solid".to_string(),
            stage_evaluated: "Phase 1".to_string(),
        }
    }

    #[test]
    fn history_is_newest_first_with_reviewer_details() {
        let (store, candidate, reviewer) = seeded();
        let t0 = Utc::now();
        store
            .append_evaluation(&evaluation(candidate, reviewer, 3), t0)
            .expect("first");
        store
            .append_evaluation(&evaluation(candidate, reviewer, 5), t0 + Duration::seconds(10))
            .expect("second");

        let history = store.evaluation_history(candidate).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].score, 5);
        assert_eq!(history[0].reviewer_name, "Hugo Neves");
        assert_eq!(history[0].reviewer_department.as_deref(), Some("HR"));
        assert_eq!(history[0].reviewer_access_level, AccessLevel::Evaluator);
    }

    #[test]
    fn advance_rolls_back_when_candidate_is_missing() {
        let (store, candidate, reviewer) = seeded();
        let err = store
            .append_and_advance(
                &evaluation(CandidateId(999), reviewer, 4),
                Stage::Dynamics,
                Utc::now(),
            )
            .expect_err("missing candidate");
        assert!(matches!(err, RepositoryError::NotFound));
        assert!(store
            .evaluation_history(candidate)
            .expect("history")
            .is_empty());
    }

    #[test]
    fn advance_writes_entry_and_stage_together() {
        let (store, candidate, reviewer) = seeded();
        store
            .append_and_advance(
                &evaluation(candidate, reviewer, 4),
                Stage::Dynamics,
                Utc::now(),
            )
            .expect("advance");
        let stored = store
            .fetch_candidate(candidate)
            .expect("fetch")
            .expect("exists");
        assert_eq!(stored.current_stage, Stage::Dynamics);
        assert_eq!(store.evaluation_history(candidate).expect("history").len(), 1);
    }
}
