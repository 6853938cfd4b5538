use chrono::{DateTime, Utc};
use serde::Serialize;

use super::access::AccessLevel;
use super::domain::{ActorId, Candidate, CandidateId, TrackId};
use super::stage::Stage;

/// Candidate fields every access level may read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateProfile {
    pub id: CandidateId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub degree_type: Option<String>,
    pub current_stage: Stage,
    pub evaluation_notes: Option<String>,
    pub intermediate_decision: Option<String>,
    pub final_decision: Option<String>,
    pub track_id: Option<TrackId>,
    pub locked_by: Option<ActorId>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Admin projection: the shared profile plus the restricted notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminCandidateProfile {
    #[serde(flatten)]
    pub profile: CandidateProfile,
    pub private_admin_notes: Option<String>,
}

/// Caller-facing candidate. The restricted variant has no notes field at all, so
/// the key is absent from serialized output rather than null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CandidateView {
    Restricted(CandidateProfile),
    Full(AdminCandidateProfile),
}

impl CandidateView {
    pub fn profile(&self) -> &CandidateProfile {
        match self {
            CandidateView::Restricted(profile) => profile,
            CandidateView::Full(admin) => &admin.profile,
        }
    }

    pub fn private_admin_notes(&self) -> Option<&str> {
        match self {
            CandidateView::Restricted(_) => None,
            CandidateView::Full(admin) => admin.private_admin_notes.as_deref(),
        }
    }
}

/// Project a stored candidate for the given access level.
pub fn project(candidate: Candidate, level: AccessLevel) -> CandidateView {
    let Candidate {
        id,
        full_name,
        email,
        phone,
        degree_type,
        current_stage,
        evaluation_notes,
        intermediate_decision,
        final_decision,
        private_admin_notes,
        track_id,
        locked_by,
        locked_at,
        created_at,
    } = candidate;

    let profile = CandidateProfile {
        id,
        full_name,
        email,
        phone,
        degree_type,
        current_stage,
        evaluation_notes,
        intermediate_decision,
        final_decision,
        track_id,
        locked_by,
        locked_at,
        created_at,
    };

    match level {
        AccessLevel::Admin => CandidateView::Full(AdminCandidateProfile {
            profile,
            private_admin_notes,
        }),
        AccessLevel::Member | AccessLevel::Evaluator => CandidateView::Restricted(profile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn candidate(notes: Option<&str>) -> Candidate {
        Candidate {
            id: CandidateId(1),
            full_name: "Rita Nogueira".to_string(),
            email: "rita@example.org".to_string(),
            phone: Some("+351 910 000 000".to_string()),
            degree_type: Some("Bachelor".to_string()),
            current_stage: Stage::Interviews,
            evaluation_notes: Some("Strong communicator".to_string()),
            intermediate_decision: None,
            final_decision: None,
            private_admin_notes: notes.map(str::to_string),
            track_id: None,
            locked_by: None,
            locked_at: None,
            created_at: Utc
                .with_ymd_and_hms(2025, 2, 1, 12, 0, 0)
                .single()
                .expect("valid"),
        }
    }

    fn as_json(view: &CandidateView) -> Value {
        serde_json::to_value(view).expect("serialize view")
    }

    #[test]
    fn members_and_evaluators_never_see_private_notes() {
        for level in [AccessLevel::Member, AccessLevel::Evaluator] {
            let view = project(candidate(Some("salary expectations")), level);
            let json = as_json(&view);
            assert!(json.get("private_admin_notes").is_none());
            assert_eq!(json.get("full_name"), Some(&Value::from("Rita Nogueira")));
            assert!(view.private_admin_notes().is_none());
        }
    }

    #[test]
    fn admins_see_stored_private_notes() {
        let view = project(candidate(Some("salary expectations")), AccessLevel::Admin);
        let json = as_json(&view);
        assert_eq!(
            json.get("private_admin_notes"),
            Some(&Value::from("salary expectations"))
        );
        assert_eq!(
            json.get("current_stage"),
            Some(&Value::from("Phase 3 (Interviews)"))
        );
    }

    #[test]
    fn admin_key_is_present_even_when_unset() {
        let json = as_json(&project(candidate(None), AccessLevel::Admin));
        assert_eq!(json.get("private_admin_notes"), Some(&Value::Null));
    }
}
