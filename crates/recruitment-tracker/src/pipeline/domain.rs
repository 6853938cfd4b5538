use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::access::AccessLevel;
use super::stage::Stage;

/// Identifier wrapper for candidate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub i64);

/// Identifier wrapper for members (reviewers, admins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub i64);

/// Identifier wrapper for recruitment tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub i64);

/// Identifier wrapper for ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub i64);

/// Stored candidate row, including restricted and lock columns.
///
/// Never serialized directly to callers; see the visibility module.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub degree_type: Option<String>,
    pub current_stage: Stage,
    pub evaluation_notes: Option<String>,
    pub intermediate_decision: Option<String>,
    pub final_decision: Option<String>,
    pub private_admin_notes: Option<String>,
    pub track_id: Option<TrackId>,
    pub locked_by: Option<ActorId>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row shape used by list views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub id: CandidateId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub degree_type: Option<String>,
    pub current_stage: Stage,
    pub track_id: Option<TrackId>,
}

/// Registration payload for a new candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub degree_type: Option<String>,
    #[serde(default)]
    pub track_id: Option<TrackId>,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidatePatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub degree_type: Option<String>,
    pub current_stage: Option<Stage>,
    pub evaluation_notes: Option<String>,
    pub intermediate_decision: Option<String>,
    pub final_decision: Option<String>,
    pub private_admin_notes: Option<String>,
    pub track_id: Option<TrackId>,
}

impl CandidatePatch {
    pub fn is_empty(&self) -> bool {
        self == &CandidatePatch::default()
    }

    pub fn touches_private_notes(&self) -> bool {
        self.private_admin_notes.is_some()
    }
}

/// Sortable columns for candidate listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSort {
    #[default]
    #[serde(alias = "full_name")]
    Name,
    #[serde(alias = "degree_type")]
    Degree,
    #[serde(alias = "current_stage")]
    Stage,
}

impl CandidateSort {
    /// Whitelisted query parameter; unknown columns fall back to the name.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "degree" | "degree_type" => CandidateSort::Degree,
            "stage" | "current_stage" => CandidateSort::Stage,
            _ => CandidateSort::Name,
        }
    }

    pub(crate) const fn column(self) -> &'static str {
        match self {
            CandidateSort::Name => "full_name",
            CandidateSort::Degree => "degree_type",
            CandidateSort::Stage => "current_stage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn from_param(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Listing filters accepted by the candidate index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateFilter {
    pub stage: Option<Stage>,
    pub degree: Option<String>,
    pub track: Option<TrackId>,
    pub sort: CandidateSort,
    pub order: SortDirection,
}

impl CandidateFilter {
    /// Degree filter with the dashboard's "All" sentinel removed.
    pub fn degree_filter(&self) -> Option<&str> {
        self.degree
            .as_deref()
            .map(str::trim)
            .filter(|degree| !degree.is_empty() && !degree.eq_ignore_ascii_case("all"))
    }
}

/// Member of the recruitment team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: ActorId,
    pub full_name: String,
    pub email: String,
    pub access_level: AccessLevel,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Directory listing row with activity counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorSummary {
    #[serde(flatten)]
    pub actor: Actor,
    pub evaluations_recorded: u64,
}

/// Registration payload for a new member. The credential hash is produced by the
/// auth provider and stored as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActor {
    pub full_name: String,
    pub email: String,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub credential_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Active,
    Archived,
}

impl TrackStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TrackStatus::Active => "active",
            TrackStatus::Archived => "archived",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "active" => Some(TrackStatus::Active),
            "archived" => Some(TrackStatus::Archived),
            _ => None,
        }
    }
}

/// Recruitment season / cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub status: TrackStatus,
    pub created_at: DateTime<Utc>,
}

/// Dashboard counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total: u64,
    pub stages: Vec<StageCount>,
}

impl PipelineStats {
    pub fn count_for(&self, stage: Stage) -> u64 {
        self.stages
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: Stage,
    pub count: u64,
}
