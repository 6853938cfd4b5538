//! Candidate pipeline: stage engine, soft locks, role-gated views, evaluation
//! ledger, tracks, roster import, and stage-based outreach.
//!
//! Storage and email transport sit behind traits so the service can be exercised
//! against the in-memory SQLite store in tests.

pub mod access;
pub mod domain;
pub mod ledger;
pub mod lock;
pub mod outreach;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod stage;
pub mod store;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use access::{AccessDenied, AccessLevel, AccessPolicy, Caller, Operation};
pub use domain::{
    Actor, ActorId, ActorSummary, Candidate, CandidateFilter, CandidateId, CandidatePatch,
    CandidateSort, CandidateSummary, EvaluationId, NewActor, NewCandidate, PipelineStats,
    SortDirection, StageCount, Track, TrackId, TrackStatus,
};
pub use ledger::{EvaluationEntry, EvaluationHistory, EvaluationInput, NewEvaluation};
pub use lock::{LockConflict, LockDecision, LockGrant, LockSnapshot, SoftLockPolicy};
pub use outreach::{
    BulkEmailRequest, BulkSendSummary, DispatchError, EmailDispatcher, EmailTemplate,
    OutboundEmail,
};
pub use repository::{
    ActorRepository, CandidateRepository, EvaluationRepository, RecruitmentStore,
    RepositoryError, TemplateRepository, TrackRepository,
};
pub use roster::{ImportSummary, RosterCsv, RosterError, RosterRow};
pub use router::{error_response, recruitment_router, ACTOR_HEADER};
pub use service::{ErrorKind, OpenedCandidate, RecruitmentError, RecruitmentService};
pub use stage::{Decision, Stage, StageTransition};
pub use store::SqliteStore;
pub use visibility::{project, CandidateView};
