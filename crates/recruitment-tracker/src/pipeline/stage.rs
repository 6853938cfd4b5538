use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed set of pipeline stages a candidate can occupy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Stage {
    #[default]
    #[serde(rename = "Phase 1 (Forms)")]
    Forms,
    #[serde(rename = "Phase 2 (Dynamics)")]
    Dynamics,
    #[serde(rename = "Phase 3 (Interviews)")]
    Interviews,
    #[serde(rename = "Phase 4 (Motivational)")]
    Motivational,
    #[serde(rename = "Waiting List")]
    WaitingList,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Rejected")]
    Rejected,
}

impl Stage {
    /// Every stage in dashboard order.
    pub const ALL: [Stage; 7] = [
        Stage::Forms,
        Stage::Dynamics,
        Stage::Interviews,
        Stage::Motivational,
        Stage::WaitingList,
        Stage::Approved,
        Stage::Rejected,
    ];

    /// The ordered main pipeline. Side states are not part of it.
    pub const PIPELINE: [Stage; 5] = [
        Stage::Forms,
        Stage::Dynamics,
        Stage::Interviews,
        Stage::Motivational,
        Stage::Approved,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Forms => "Phase 1 (Forms)",
            Stage::Dynamics => "Phase 2 (Dynamics)",
            Stage::Interviews => "Phase 3 (Interviews)",
            Stage::Motivational => "Phase 4 (Motivational)",
            Stage::WaitingList => "Waiting List",
            Stage::Approved => "Approved",
            Stage::Rejected => "Rejected",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.label().eq_ignore_ascii_case(trimmed))
    }

    /// Next stage in the ordered pipeline, if any.
    pub fn successor(self) -> Option<Self> {
        let index = Stage::PIPELINE.iter().position(|stage| *stage == self)?;
        Stage::PIPELINE.get(index + 1).copied()
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Stage::Approved | Stage::Rejected)
    }

    /// Target stage for a reviewer decision. Never fails: decisions without a
    /// meaningful target leave the stage unchanged.
    pub fn apply(self, decision: Decision) -> Self {
        match decision {
            Decision::Pass => match self {
                Stage::WaitingList => Stage::Motivational,
                current => current.successor().unwrap_or(current),
            },
            Decision::Waitlist => Stage::WaitingList,
            Decision::Fail => Stage::Rejected,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::from_label(value).ok_or_else(|| UnknownStage(value.to_string()))
    }
}

/// Reviewer decision driving a stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pass,
    Waitlist,
    Fail,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Decision::Pass => "pass",
            Decision::Waitlist => "waitlist",
            Decision::Fail => "fail",
        }
    }
}

/// Result of applying a decision, returned to callers for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageTransition {
    pub decision: Decision,
    pub from: Stage,
    pub to: Stage,
    pub changed: bool,
    /// Whether the target stage closes the candidate's pipeline.
    pub terminal: bool,
}

impl StageTransition {
    pub fn plan(from: Stage, decision: Decision) -> Self {
        let to = from.apply(decision);
        Self {
            decision,
            from,
            to,
            changed: from != to,
            terminal: to.is_terminal(),
        }
    }
}
