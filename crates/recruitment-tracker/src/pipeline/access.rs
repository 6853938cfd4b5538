use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::ActorId;

/// Role tier resolved by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AccessLevel {
    Member = 1,
    Evaluator = 2,
    Admin = 3,
}

impl AccessLevel {
    pub const fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(AccessLevel::Member),
            2 => Some(AccessLevel::Evaluator),
            3 => Some(AccessLevel::Admin),
            _ => None,
        }
    }


    pub const fn level(self) -> i64 {
        self as i64
    }

    pub const fn label(self) -> &'static str {
        match self {
            AccessLevel::Member => "Member",
            AccessLevel::Evaluator => "Evaluator",
            AccessLevel::Admin => "Admin",
        }
    }
}

impl TryFrom<i64> for AccessLevel {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        AccessLevel::from_level(value)
            .ok_or_else(|| format!("access level must be 1, 2 or 3 (got {value})"))
    }
}

impl From<AccessLevel> for i64 {
    fn from(value: AccessLevel) -> Self {
        value.level()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.level())
    }
}

/// Operations gated by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadCandidates,
    ReadStats,
    ReadTracks,
    ReadEvaluations,
    ReadActors,
    ReadTemplates,
    AcquireLock,
    SubmitEvaluation,
    CreateCandidate,
    EditCandidate,
    ChangeStage,
    SendBulkEmail,
    EditPrivateNotes,
    ManageActors,
    ManageTracks,
    ManageTemplates,
    DeleteCandidates,
    ImportRoster,
}

impl Operation {
    pub const fn label(self) -> &'static str {
        match self {
            Operation::ReadCandidates => "read candidates",
            Operation::ReadStats => "read stats",
            Operation::ReadTracks => "read tracks",
            Operation::ReadEvaluations => "read evaluations",
            Operation::ReadActors => "read members",
            Operation::ReadTemplates => "read email templates",
            Operation::AcquireLock => "lock candidate",
            Operation::SubmitEvaluation => "submit evaluation",
            Operation::CreateCandidate => "create candidate",
            Operation::EditCandidate => "edit candidate",
            Operation::ChangeStage => "change stage",
            Operation::SendBulkEmail => "send bulk email",
            Operation::EditPrivateNotes => "edit private admin notes",
            Operation::ManageActors => "manage members",
            Operation::ManageTracks => "manage tracks",
            Operation::ManageTemplates => "manage email templates",
            Operation::DeleteCandidates => "delete candidates",
            Operation::ImportRoster => "import roster",
        }
    }
}

/// Static policy table.
pub struct AccessPolicy;

impl AccessPolicy {
    pub const fn minimum_level(operation: Operation) -> AccessLevel {
        match operation {
            Operation::ReadCandidates
            | Operation::ReadStats
            | Operation::ReadTracks
            | Operation::ReadEvaluations
            | Operation::ReadActors
            | Operation::ReadTemplates
            | Operation::AcquireLock
            | Operation::SubmitEvaluation => AccessLevel::Member,
            Operation::CreateCandidate
            | Operation::EditCandidate
            | Operation::ChangeStage
            | Operation::SendBulkEmail => AccessLevel::Evaluator,
            Operation::EditPrivateNotes
            | Operation::ManageActors
            | Operation::ManageTracks
            | Operation::ManageTemplates
            | Operation::DeleteCandidates
            | Operation::ImportRoster => AccessLevel::Admin,
        }
    }

    pub fn permits(level: AccessLevel, operation: Operation) -> bool {
        level >= Self::minimum_level(operation)
    }

    pub fn require(caller: &Caller, operation: Operation) -> Result<(), AccessDenied> {
        if Self::permits(caller.access_level, operation) {
            Ok(())
        } else {
            Err(AccessDenied {
                operation,
                required: Self::minimum_level(operation),
                actual: caller.access_level,
            })
        }
    }
}

/// Identity handed over by the auth provider for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub actor_id: ActorId,
    pub access_level: AccessLevel,
}

impl Caller {
    pub fn new(actor_id: ActorId, access_level: AccessLevel) -> Self {
        Self {
            actor_id,
            access_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("access denied: {} requires {required}, caller is {actual}", operation.label())]
pub struct AccessDenied {
    pub operation: Operation,
    pub required: AccessLevel,
    pub actual: AccessLevel,
}
