use chrono::{DateTime, Utc};

use super::access::AccessLevel;
use super::domain::{
    Actor, ActorId, ActorSummary, Candidate, CandidateFilter, CandidateId, CandidatePatch,
    CandidateSummary, NewActor, NewCandidate, PipelineStats, Track, TrackId,
};
use super::ledger::{EvaluationEntry, NewEvaluation};
use super::lock::LockSnapshot;
use super::outreach::EmailTemplate;
use super::roster::{ImportSummary, RosterRow};
use super::stage::Stage;

/// Candidate record store. Every method is a narrow, single-purpose operation.
pub trait CandidateRepository: Send + Sync {
    fn insert_candidate(
        &self,
        candidate: &NewCandidate,
        created_at: DateTime<Utc>,
    ) -> Result<Candidate, RepositoryError>;
    fn fetch_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, RepositoryError>;
    fn list_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateSummary>, RepositoryError>;
    /// Applies the non-empty fields of `patch`; `None` when the row is absent.
    fn update_candidate(
        &self,
        id: CandidateId,
        patch: &CandidatePatch,
    ) -> Result<Option<Candidate>, RepositoryError>;
    /// Writes `current_stage` only. Returns false when the row is absent.
    fn set_stage(&self, id: CandidateId, stage: Stage) -> Result<bool, RepositoryError>;
    fn lock_snapshot(&self, id: CandidateId) -> Result<Option<LockSnapshot>, RepositoryError>;
    fn write_lock(
        &self,
        id: CandidateId,
        actor: ActorId,
        locked_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    /// Removes the candidates and their evaluations in one transaction.
    fn delete_candidates(&self, ids: &[CandidateId]) -> Result<usize, RepositoryError>;
    fn stage_counts(&self) -> Result<PipelineStats, RepositoryError>;
    fn upsert_roster(
        &self,
        rows: &[RosterRow],
        created_at: DateTime<Utc>,
    ) -> Result<ImportSummary, RepositoryError>;
    fn candidates_in_stage(&self, stage: Stage) -> Result<Vec<Candidate>, RepositoryError>;
}

/// Append-only evaluation ledger.
pub trait EvaluationRepository: Send + Sync {
    fn append_evaluation(
        &self,
        evaluation: &NewEvaluation,
        created_at: DateTime<Utc>,
    ) -> Result<EvaluationEntry, RepositoryError>;
    /// Appends the entry and moves the candidate to `stage` in one transaction.
    fn append_and_advance(
        &self,
        evaluation: &NewEvaluation,
        stage: Stage,
        created_at: DateTime<Utc>,
    ) -> Result<EvaluationEntry, RepositoryError>;
    fn evaluation_history(
        &self,
        candidate: CandidateId,
    ) -> Result<Vec<EvaluationEntry>, RepositoryError>;
}

pub trait ActorRepository: Send + Sync {
    fn insert_actor(
        &self,
        actor: &NewActor,
        created_at: DateTime<Utc>,
    ) -> Result<Actor, RepositoryError>;
    fn fetch_actor(&self, id: ActorId) -> Result<Option<Actor>, RepositoryError>;
    fn list_actors(&self) -> Result<Vec<ActorSummary>, RepositoryError>;
    fn set_access_level(
        &self,
        id: ActorId,
        level: AccessLevel,
    ) -> Result<Option<Actor>, RepositoryError>;
    fn delete_actor(&self, id: ActorId) -> Result<bool, RepositoryError>;
}

pub trait TrackRepository: Send + Sync {
    /// Archives every track and inserts the new one as active, atomically.
    fn create_active_track(
        &self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Track, RepositoryError>;
    /// Archives every track and activates `id`, atomically. `None` when absent.
    fn activate_track(&self, id: TrackId) -> Result<Option<Track>, RepositoryError>;
    fn fetch_track(&self, id: TrackId) -> Result<Option<Track>, RepositoryError>;
    fn delete_track(&self, id: TrackId) -> Result<bool, RepositoryError>;
    fn list_tracks(&self) -> Result<Vec<Track>, RepositoryError>;
}

pub trait TemplateRepository: Send + Sync {
    fn template_for(&self, name: &str) -> Result<Option<EmailTemplate>, RepositoryError>;
    fn save_template(&self, template: &EmailTemplate) -> Result<(), RepositoryError>;
}

/// Everything the service needs from storage.
pub trait RecruitmentStore:
    CandidateRepository
    + EvaluationRepository
    + ActorRepository
    + TrackRepository
    + TemplateRepository
{
}

impl<T> RecruitmentStore for T where
    T: CandidateRepository
        + EvaluationRepository
        + ActorRepository
        + TrackRepository
        + TemplateRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record is still referenced: {0}")]
    Integrity(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(message)) => {
                if message.contains("UNIQUE") {
                    RepositoryError::Conflict(message)
                } else if message.contains("FOREIGN KEY") || message.contains("CHECK") {
                    RepositoryError::Integrity(message)
                } else {
                    RepositoryError::Unavailable(message)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound,
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}
