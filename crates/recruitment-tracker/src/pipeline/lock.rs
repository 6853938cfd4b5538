use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::domain::{ActorId, CandidateId};

/// Default staleness threshold after which another member may take over a lock.
pub const DEFAULT_LOCK_STALENESS_SECS: i64 = 5 * 60;

/// Display name used when the current holder can no longer be resolved.
pub const UNKNOWN_HOLDER: &str = "Unknown Member";

/// Lock columns of a candidate row plus the holder's display name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockSnapshot {
    pub locked_by: Option<ActorId>,
    pub locked_at: Option<DateTime<Utc>>,
    pub holder_name: Option<String>,
}

/// Outcome of comparing a lock request against the stored ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    Grant,
    Conflict { holder: ActorId, holder_name: String },
}

/// Advisory, time-bounded edit claim policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftLockPolicy {
    staleness: Duration,
}

impl SoftLockPolicy {
    pub fn new(staleness: Duration) -> Self {
        let sanitized = if staleness > Duration::zero() {
            staleness
        } else {
            Duration::seconds(DEFAULT_LOCK_STALENESS_SECS)
        };

        Self {
            staleness: sanitized,
        }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    pub fn evaluate(
        &self,
        snapshot: &LockSnapshot,
        requester: ActorId,
        now: DateTime<Utc>,
    ) -> LockDecision {
        let holder = match snapshot.locked_by {
            Some(holder) if holder != requester => holder,
            _ => return LockDecision::Grant,
        };

        let locked_at = match snapshot.locked_at {
            Some(locked_at) => locked_at,
            None => return LockDecision::Grant,
        };

        if now - locked_at >= self.staleness {
            return LockDecision::Grant;
        }

        LockDecision::Conflict {
            holder,
            holder_name: snapshot
                .holder_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_HOLDER.to_string()),
        }
    }

    pub fn expires_at(&self, locked_at: DateTime<Utc>) -> DateTime<Utc> {
        locked_at + self.staleness
    }
}

impl Default for SoftLockPolicy {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_LOCK_STALENESS_SECS))
    }
}

/// Lock granted to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockGrant {
    pub candidate_id: CandidateId,
    pub locked_by: ActorId,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Locked by {holder_name}")]
pub struct LockConflict {
    pub candidate_id: CandidateId,
    pub holder: ActorId,
    pub holder_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).single().expect("valid")
    }

    fn held_by(actor: i64, at: DateTime<Utc>) -> LockSnapshot {
        LockSnapshot {
            locked_by: Some(ActorId(actor)),
            locked_at: Some(at),
            holder_name: Some("Ana Costa".to_string()),
        }
    }

    #[test]
    fn unlocked_rows_are_granted() {
        let policy = SoftLockPolicy::default();
        assert_eq!(
            policy.evaluate(&LockSnapshot::default(), ActorId(1), t0()),
            LockDecision::Grant
        );
    }

    #[test]
    fn same_actor_reacquires() {
        let policy = SoftLockPolicy::default();
        let snapshot = held_by(1, t0());
        assert_eq!(
            policy.evaluate(&snapshot, ActorId(1), t0() + Duration::seconds(30)),
            LockDecision::Grant
        );
    }

    #[test]
    fn fresh_lock_conflicts_for_other_actor() {
        let policy = SoftLockPolicy::default();
        let snapshot = held_by(1, t0());
        match policy.evaluate(&snapshot, ActorId(2), t0() + Duration::minutes(4)) {
            LockDecision::Conflict {
                holder,
                holder_name,
            } => {
                assert_eq!(holder, ActorId(1));
                assert_eq!(holder_name, "Ana Costa");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let policy = SoftLockPolicy::default();
        let snapshot = held_by(1, t0());
        assert_eq!(
            policy.evaluate(&snapshot, ActorId(2), t0() + Duration::minutes(6)),
            LockDecision::Grant
        );
        assert_eq!(
            policy.evaluate(&snapshot, ActorId(2), t0() + Duration::minutes(5)),
            LockDecision::Grant
        );
    }

    #[test]
    fn holder_without_timestamp_counts_as_stale() {
        let policy = SoftLockPolicy::default();
        let snapshot = LockSnapshot {
            locked_by: Some(ActorId(1)),
            locked_at: None,
            holder_name: None,
        };
        assert_eq!(
            policy.evaluate(&snapshot, ActorId(2), t0()),
            LockDecision::Grant
        );
    }

    #[test]
    fn unresolved_holder_gets_placeholder_name() {
        let policy = SoftLockPolicy::default();
        let snapshot = LockSnapshot {
            locked_by: Some(ActorId(1)),
            locked_at: Some(t0()),
            holder_name: None,
        };
        match policy.evaluate(&snapshot, ActorId(2), t0()) {
            LockDecision::Conflict { holder_name, .. } => assert_eq!(holder_name, UNKNOWN_HOLDER),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_staleness_falls_back_to_default() {
        let policy = SoftLockPolicy::new(Duration::zero());
        assert_eq!(
            policy.staleness(),
            Duration::seconds(DEFAULT_LOCK_STALENESS_SECS)
        );
    }
}
