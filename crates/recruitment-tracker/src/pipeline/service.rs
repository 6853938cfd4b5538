use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::access::{AccessDenied, AccessLevel, AccessPolicy, Caller, Operation};
use super::domain::{
    Actor, ActorId, ActorSummary, CandidateFilter, CandidateId, CandidatePatch, CandidateSummary,
    NewActor, NewCandidate, PipelineStats, Track, TrackId,
};
use super::ledger::{
    EvaluationEntry, EvaluationHistory, EvaluationInput, EvaluationRejected, NewEvaluation,
};
use super::lock::{LockConflict, LockDecision, LockGrant, SoftLockPolicy};
use super::outreach::{BulkEmailRequest, BulkSendSummary, EmailDispatcher, EmailTemplate};
use super::repository::{RecruitmentStore, RepositoryError};
use super::roster::{ImportSummary, RosterError, RosterRow};
use super::stage::{Decision, Stage, StageTransition, UnknownStage};
use super::visibility::{project, CandidateView};

/// Service composing the access policy, soft-lock policy, store, and email transport.
pub struct RecruitmentService<S, D> {
    store: Arc<S>,
    dispatcher: Arc<D>,
    locks: SoftLockPolicy,
}

/// Result of opening a candidate profile for editing.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedCandidate {
    pub candidate: CandidateView,
    pub editable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockGrant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
}

impl<S, D> RecruitmentService<S, D>
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<D>, locks: SoftLockPolicy) -> Self {
        Self {
            store,
            dispatcher,
            locks,
        }
    }

    pub fn lock_policy(&self) -> SoftLockPolicy {
        self.locks
    }

    /// Turns an actor id vouched for by the auth provider into a caller with the
    /// stored access level.
    pub fn resolve_caller(&self, actor_id: ActorId) -> Result<Caller, RecruitmentError> {
        let actor = self
            .store
            .fetch_actor(actor_id)?
            .ok_or(RecruitmentError::Unauthenticated)?;
        Ok(Caller::new(actor.id, actor.access_level))
    }

    pub fn create_candidate(
        &self,
        caller: &Caller,
        candidate: NewCandidate,
    ) -> Result<CandidateView, RecruitmentError> {
        AccessPolicy::require(caller, Operation::CreateCandidate)?;

        let candidate = NewCandidate {
            full_name: required_text("full_name", &candidate.full_name)?,
            email: normalized_email(&candidate.email)?,
            phone: optional_text(candidate.phone),
            degree_type: optional_text(candidate.degree_type),
            track_id: candidate.track_id,
        };
        if let Some(track) = candidate.track_id {
            self.ensure_track(track)?;
        }

        let stored = self.store.insert_candidate(&candidate, Utc::now())?;
        info!(candidate = stored.id.0, actor = caller.actor_id.0, "candidate created");
        Ok(project(stored, caller.access_level))
    }

    pub fn get_candidate(
        &self,
        caller: &Caller,
        id: CandidateId,
    ) -> Result<CandidateView, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ReadCandidates)?;
        let candidate = self
            .store
            .fetch_candidate(id)?
            .ok_or_else(|| RecruitmentError::candidate_not_found(id))?;
        Ok(project(candidate, caller.access_level))
    }

    pub fn list_candidates(
        &self,
        caller: &Caller,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateSummary>, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ReadCandidates)?;
        Ok(self.store.list_candidates(filter)?)
    }

    /// Partial update. Restricted fields are refused, never silently dropped.
    pub fn update_candidate(
        &self,
        caller: &Caller,
        id: CandidateId,
        patch: CandidatePatch,
    ) -> Result<CandidateView, RecruitmentError> {
        AccessPolicy::require(caller, Operation::EditCandidate)?;
        if patch.is_empty() {
            return Err(RecruitmentError::Validation("no fields to update".to_string()));
        }
        if patch.touches_private_notes() {
            AccessPolicy::require(caller, Operation::EditPrivateNotes)?;
        }
        if patch.current_stage.is_some() {
            AccessPolicy::require(caller, Operation::ChangeStage)?;
        }

        let patch = CandidatePatch {
            full_name: patch
                .full_name
                .map(|name| required_text("full_name", &name))
                .transpose()?,
            email: patch.email.map(|email| normalized_email(&email)).transpose()?,
            ..patch
        };
        if let Some(track) = patch.track_id {
            self.ensure_track(track)?;
        }

        let updated = self
            .store
            .update_candidate(id, &patch)?
            .ok_or_else(|| RecruitmentError::candidate_not_found(id))?;
        info!(candidate = id.0, actor = caller.actor_id.0, "candidate updated");
        Ok(project(updated, caller.access_level))
    }

    pub fn delete_candidate(
        &self,
        caller: &Caller,
        id: CandidateId,
    ) -> Result<(), RecruitmentError> {
        AccessPolicy::require(caller, Operation::DeleteCandidates)?;
        if self.store.delete_candidates(&[id])? == 0 {
            return Err(RecruitmentError::candidate_not_found(id));
        }
        info!(candidate = id.0, actor = caller.actor_id.0, "candidate deleted");
        Ok(())
    }

    pub fn bulk_delete_candidates(
        &self,
        caller: &Caller,
        ids: &[CandidateId],
    ) -> Result<usize, RecruitmentError> {
        AccessPolicy::require(caller, Operation::DeleteCandidates)?;
        if ids.is_empty() {
            return Err(RecruitmentError::Validation(
                "no candidates selected".to_string(),
            ));
        }
        let removed = self.store.delete_candidates(ids)?;
        info!(requested = ids.len(), removed, actor = caller.actor_id.0, "candidates deleted");
        Ok(removed)
    }

    pub fn stats(&self, caller: &Caller) -> Result<PipelineStats, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ReadStats)?;
        Ok(self.store.stage_counts()?)
    }

    /// Claims the advisory edit lock on a candidate for the caller.
    pub fn acquire_lock(
        &self,
        caller: &Caller,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<LockGrant, RecruitmentError> {
        AccessPolicy::require(caller, Operation::AcquireLock)?;
        let snapshot = self
            .store
            .lock_snapshot(id)?
            .ok_or_else(|| RecruitmentError::candidate_not_found(id))?;

        match self.locks.evaluate(&snapshot, caller.actor_id, now) {
            LockDecision::Grant => {
                self.store.write_lock(id, caller.actor_id, now)?;
                info!(candidate = id.0, actor = caller.actor_id.0, "lock granted");
                Ok(LockGrant {
                    candidate_id: id,
                    locked_by: caller.actor_id,
                    locked_at: now,
                    expires_at: self.locks.expires_at(now),
                })
            }
            LockDecision::Conflict {
                holder,
                holder_name,
            } => {
                info!(
                    candidate = id.0,
                    actor = caller.actor_id.0,
                    holder = holder.0,
                    "lock held by another member"
                );
                Err(LockConflict {
                    candidate_id: id,
                    holder,
                    holder_name,
                }
                .into())
            }
        }
    }

    /// Tries the lock and degrades to a read-only view when someone else holds it.
    pub fn open_candidate(
        &self,
        caller: &Caller,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<OpenedCandidate, RecruitmentError> {
        let (lock, locked_by) = match self.acquire_lock(caller, id, now) {
            Ok(grant) => (Some(grant), None),
            Err(RecruitmentError::Lock(conflict)) => (None, Some(conflict.holder_name)),
            Err(other) => return Err(other),
        };
        let candidate = self.get_candidate(caller, id)?;

        Ok(OpenedCandidate {
            candidate,
            editable: lock.is_some(),
            lock,
            locked_by,
        })
    }

    /// Moves the candidate according to a reviewer decision. Only `current_stage`
    /// is written.
    pub fn apply_decision(
        &self,
        caller: &Caller,
        id: CandidateId,
        decision: Decision,
    ) -> Result<StageTransition, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ChangeStage)?;
        let candidate = self
            .store
            .fetch_candidate(id)?
            .ok_or_else(|| RecruitmentError::candidate_not_found(id))?;

        let transition = StageTransition::plan(candidate.current_stage, decision);
        if transition.changed && !self.store.set_stage(id, transition.to)? {
            return Err(RecruitmentError::candidate_not_found(id));
        }

        info!(
            candidate = id.0,
            actor = caller.actor_id.0,
            decision = decision.label(),
            from = %transition.from,
            to = %transition.to,
            "stage decision applied"
        );
        Ok(transition)
    }

    pub fn record_evaluation(
        &self,
        caller: &Caller,
        id: CandidateId,
        input: EvaluationInput,
    ) -> Result<EvaluationEntry, RecruitmentError> {
        AccessPolicy::require(caller, Operation::SubmitEvaluation)?;
        let evaluation = NewEvaluation::validate(id, caller.actor_id, input)?;
        if self.store.fetch_candidate(id)?.is_none() {
            return Err(RecruitmentError::candidate_not_found(id));
        }

        let entry = self.store.append_evaluation(&evaluation, Utc::now())?;
        info!(
            candidate = id.0,
            reviewer = caller.actor_id.0,
            score = entry.score,
            "evaluation recorded"
        );
        Ok(entry)
    }

    /// Appends an evaluation and moves the candidate to the evaluated stage, all or
    /// nothing.
    pub fn record_evaluation_and_advance(
        &self,
        caller: &Caller,
        id: CandidateId,
        input: EvaluationInput,
    ) -> Result<EvaluationEntry, RecruitmentError> {
        AccessPolicy::require(caller, Operation::SubmitEvaluation)?;
        AccessPolicy::require(caller, Operation::ChangeStage)?;
        let stage: Stage = input.stage_label.parse()?;
        let input = EvaluationInput {
            stage_label: stage.label().to_string(),
            ..input
        };
        let evaluation = NewEvaluation::validate(id, caller.actor_id, input)?;

        let entry = match self.store.append_and_advance(&evaluation, stage, Utc::now()) {
            Err(RepositoryError::NotFound) => {
                return Err(RecruitmentError::candidate_not_found(id));
            }
            other => other?,
        };
        info!(
            candidate = id.0,
            reviewer = caller.actor_id.0,
            to = %stage,
            "evaluation recorded and stage advanced"
        );
        Ok(entry)
    }

    pub fn history(
        &self,
        caller: &Caller,
        id: CandidateId,
    ) -> Result<EvaluationHistory, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ReadEvaluations)?;
        if self.store.fetch_candidate(id)?.is_none() {
            return Err(RecruitmentError::candidate_not_found(id));
        }
        Ok(EvaluationHistory::new(self.store.evaluation_history(id)?))
    }

    pub fn list_tracks(&self, caller: &Caller) -> Result<Vec<Track>, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ReadTracks)?;
        Ok(self.store.list_tracks()?)
    }

    /// Creates a track and makes it the only active one.
    pub fn create_track(&self, caller: &Caller, name: &str) -> Result<Track, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ManageTracks)?;
        let name = required_text("name", name)?;
        let track = self.store.create_active_track(&name, Utc::now())?;
        info!(track = track.id.0, actor = caller.actor_id.0, "track created and activated");
        Ok(track)
    }

    pub fn activate_track(&self, caller: &Caller, id: TrackId) -> Result<Track, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ManageTracks)?;
        let track = self
            .store
            .activate_track(id)?
            .ok_or_else(|| RecruitmentError::NotFound(format!("track {} not found", id.0)))?;
        info!(track = id.0, actor = caller.actor_id.0, "track activated");
        Ok(track)
    }

    pub fn delete_track(&self, caller: &Caller, id: TrackId) -> Result<(), RecruitmentError> {
        AccessPolicy::require(caller, Operation::ManageTracks)?;
        if !self.store.delete_track(id)? {
            return Err(RecruitmentError::NotFound(format!("track {} not found", id.0)));
        }
        info!(track = id.0, actor = caller.actor_id.0, "track deleted");
        Ok(())
    }

    pub fn list_actors(&self, caller: &Caller) -> Result<Vec<ActorSummary>, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ReadActors)?;
        Ok(self.store.list_actors()?)
    }

    pub fn register_actor(
        &self,
        caller: &Caller,
        actor: NewActor,
    ) -> Result<Actor, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ManageActors)?;
        let actor = NewActor {
            full_name: required_text("full_name", &actor.full_name)?,
            email: normalized_email(&actor.email)?,
            access_level: actor.access_level,
            department: optional_text(actor.department),
            credential_hash: actor.credential_hash,
        };
        let stored = self.store.insert_actor(&actor, Utc::now())?;
        info!(member = stored.id.0, level = stored.access_level.level(), "member registered");
        Ok(stored)
    }

    /// Bootstrap path for the CLI: registers a member without a calling actor.
    pub fn register_initial_actor(&self, actor: NewActor) -> Result<Actor, RecruitmentError> {
        let system = Caller::new(ActorId(0), AccessLevel::Admin);
        self.register_actor(&system, actor)
    }

    pub fn set_access_level(
        &self,
        caller: &Caller,
        id: ActorId,
        level: AccessLevel,
    ) -> Result<Actor, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ManageActors)?;
        let actor = self
            .store
            .set_access_level(id, level)?
            .ok_or_else(|| RecruitmentError::actor_not_found(id))?;
        info!(
            member = id.0,
            level = level.level(),
            actor = caller.actor_id.0,
            "access level changed"
        );
        Ok(actor)
    }

    pub fn remove_actor(&self, caller: &Caller, id: ActorId) -> Result<(), RecruitmentError> {
        AccessPolicy::require(caller, Operation::ManageActors)?;
        if id == caller.actor_id {
            return Err(RecruitmentError::Validation(
                "members cannot remove themselves".to_string(),
            ));
        }
        if !self.store.delete_actor(id)? {
            return Err(RecruitmentError::actor_not_found(id));
        }
        info!(member = id.0, actor = caller.actor_id.0, "member removed");
        Ok(())
    }

    /// Upserts spreadsheet rows by email. Any invalid row rejects the whole batch.
    pub fn import_roster(
        &self,
        caller: &Caller,
        rows: Vec<RosterRow>,
    ) -> Result<ImportSummary, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ImportRoster)?;
        let rows = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                row.normalized().map_err(|err| {
                    RecruitmentError::Validation(format!("row {}: {err}", index + 1))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let summary = self.store.upsert_roster(&rows, Utc::now())?;
        info!(
            processed = summary.processed,
            inserted = summary.inserted,
            updated = summary.updated,
            "roster imported"
        );
        Ok(summary)
    }

    pub fn template_for_stage(
        &self,
        caller: &Caller,
        stage: Stage,
    ) -> Result<EmailTemplate, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ReadTemplates)?;
        self.store.template_for(stage.label())?.ok_or_else(|| {
            RecruitmentError::NotFound(format!("No template found for stage: {stage}"))
        })
    }

    pub fn save_template(
        &self,
        caller: &Caller,
        template: EmailTemplate,
    ) -> Result<EmailTemplate, RecruitmentError> {
        AccessPolicy::require(caller, Operation::ManageTemplates)?;
        let stage: Stage = template.name.parse()?;
        let template = EmailTemplate::for_stage(
            stage,
            required_text("subject", &template.subject)?,
            required_text("body", &template.body)?,
        );
        self.store.save_template(&template)?;
        info!(stage = %stage, actor = caller.actor_id.0, "email template saved");
        Ok(template)
    }

    /// Sends the stage template to every candidate in the stage. Per-recipient
    /// failures are counted, never raised.
    pub fn send_bulk(
        &self,
        caller: &Caller,
        request: BulkEmailRequest,
    ) -> Result<BulkSendSummary, RecruitmentError> {
        AccessPolicy::require(caller, Operation::SendBulkEmail)?;
        let template = match self.store.template_for(request.stage.label())? {
            Some(stored) => stored,
            None => request.fallback_template().ok_or_else(|| {
                RecruitmentError::Validation(format!(
                    "no template stored for {} and no subject/message supplied",
                    request.stage
                ))
            })?,
        };

        let mut summary = BulkSendSummary::default();
        for candidate in self.store.candidates_in_stage(request.stage)? {
            let email = template.render(&candidate);
            if !email.has_plausible_recipient() {
                warn!(candidate = candidate.id.0, "skipping invalid recipient address");
                summary.failed += 1;
                continue;
            }
            match self.dispatcher.dispatch(&email) {
                Ok(()) => summary.sent += 1,
                Err(err) => {
                    warn!(candidate = candidate.id.0, error = %err, "email dispatch failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            stage = %request.stage,
            attempted = summary.attempted(),
            sent = summary.sent,
            failed = summary.failed,
            "bulk email dispatched"
        );
        Ok(summary)
    }

    fn ensure_track(&self, id: TrackId) -> Result<(), RecruitmentError> {
        match self.store.fetch_track(id)? {
            Some(_) => Ok(()),
            None => Err(RecruitmentError::Validation(format!(
                "track {} does not exist",
                id.0
            ))),
        }
    }
}

fn required_text(field: &str, value: &str) -> Result<String, RecruitmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecruitmentError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn normalized_email(value: &str) -> Result<String, RecruitmentError> {
    let email = value.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(RecruitmentError::Validation(format!(
            "'{}' is not a valid email address",
            value.trim()
        ))),
    }
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    LockConflict,
    AuthorizationError,
    IntegrityViolation,
    DependencyFailure,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::LockConflict => "LockConflict",
            ErrorKind::AuthorizationError => "AuthorizationError",
            ErrorKind::IntegrityViolation => "IntegrityViolation",
            ErrorKind::DependencyFailure => "DependencyFailure",
        }
    }
}

/// Error raised by the recruitment service.
#[derive(Debug, thiserror::Error)]
pub enum RecruitmentError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Lock(#[from] LockConflict),
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error("caller could not be identified")]
    Unauthenticated,
    #[error("{0}")]
    Integrity(String),
    #[error("storage unavailable: {0}")]
    Dependency(String),
}

impl RecruitmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecruitmentError::Validation(_) => ErrorKind::ValidationError,
            RecruitmentError::NotFound(_) => ErrorKind::NotFound,
            RecruitmentError::Lock(_) => ErrorKind::LockConflict,
            RecruitmentError::Denied(_) | RecruitmentError::Unauthenticated => {
                ErrorKind::AuthorizationError
            }
            RecruitmentError::Integrity(_) => ErrorKind::IntegrityViolation,
            RecruitmentError::Dependency(_) => ErrorKind::DependencyFailure,
        }
    }

    fn candidate_not_found(id: CandidateId) -> Self {
        RecruitmentError::NotFound(format!("candidate {} not found", id.0))
    }

    fn actor_not_found(id: ActorId) -> Self {
        RecruitmentError::NotFound(format!("member {} not found", id.0))
    }
}

impl From<RepositoryError> for RecruitmentError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => RecruitmentError::Integrity(format!(
                "a record with the same unique value already exists ({message})"
            )),
            RepositoryError::Integrity(message) => RecruitmentError::Integrity(message),
            RepositoryError::NotFound => RecruitmentError::NotFound("record not found".to_string()),
            RepositoryError::Unavailable(message) => RecruitmentError::Dependency(message),
        }
    }
}

impl From<EvaluationRejected> for RecruitmentError {
    fn from(err: EvaluationRejected) -> Self {
        RecruitmentError::Validation(err.to_string())
    }
}

impl From<UnknownStage> for RecruitmentError {
    fn from(err: UnknownStage) -> Self {
        RecruitmentError::Validation(err.to_string())
    }
}

impl From<RosterError> for RecruitmentError {
    fn from(err: RosterError) -> Self {
        RecruitmentError::Validation(err.to_string())
    }
}
