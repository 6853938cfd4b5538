use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::access::AccessLevel;
use super::domain::{ActorId, CandidateId, EvaluationId};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// Reviewer input for a ledger entry, as submitted over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationInput {
    #[serde(alias = "rating")]
    pub score: u8,
    #[serde(default)]
    pub feedback: String,
    #[serde(alias = "stage_evaluated")]
    pub stage_label: String,
}

/// Validated ledger entry ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvaluation {
    pub candidate_id: CandidateId,
    pub reviewer_id: ActorId,
    pub score: u8,
    pub feedback: String,
    pub stage_evaluated: String,
}

impl NewEvaluation {
    pub fn validate(
        candidate_id: CandidateId,
        reviewer_id: ActorId,
        input: EvaluationInput,
    ) -> Result<Self, EvaluationRejected> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&input.score) {
            return Err(EvaluationRejected::ScoreOutOfRange(input.score));
        }

        let stage_evaluated = input.stage_label.trim().to_string();
        if stage_evaluated.is_empty() {
            return Err(EvaluationRejected::MissingStageLabel);
        }

        Ok(Self {
            candidate_id,
            reviewer_id,
            score: input.score,
            feedback: input.feedback.trim().to_string(),
            stage_evaluated,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationRejected {
    #[error("score must be between 1 and 5 (got {0})")]
    ScoreOutOfRange(u8),
    #[error("stage label is required")]
    MissingStageLabel,
}

/// Stored evaluation joined with the reviewer's directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationEntry {
    pub id: EvaluationId,
    pub candidate_id: CandidateId,
    pub reviewer_id: ActorId,
    pub reviewer_name: String,
    pub reviewer_department: Option<String>,
    pub reviewer_access_level: AccessLevel,
    pub score: u8,
    pub feedback: String,
    pub stage_evaluated: String,
    pub created_at: DateTime<Utc>,
}

/// Newest-first evaluation history for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct EvaluationHistory {
    entries: Vec<EvaluationEntry>,
}

impl EvaluationHistory {
    pub(crate) fn new(mut entries: Vec<EvaluationEntry>) -> Self {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&EvaluationEntry> {
        self.entries.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvaluationEntry> {
        self.entries.iter()
    }

    pub fn average_score(&self) -> Option<f32> {
        if self.entries.is_empty() {
            return None;
        }
        let total: u32 = self.entries.iter().map(|entry| entry.score as u32).sum();
        Some(total as f32 / self.entries.len() as f32)
    }
}

impl IntoIterator for EvaluationHistory {
    type Item = EvaluationEntry;
    type IntoIter = std::vec::IntoIter<EvaluationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a EvaluationHistory {
    type Item = &'a EvaluationEntry;
    type IntoIter = std::slice::Iter<'a, EvaluationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
