use super::common::*;
use chrono::Duration;

use crate::pipeline::domain::CandidateId;
use crate::pipeline::service::{ErrorKind, RecruitmentError};

#[test]
fn second_member_conflicts_until_the_lock_goes_stale() {
    let (service, store, _) = build_service();
    let (admin, evaluator, member) = seed_team(&store);
    let id = seed_candidate(&service, &evaluator, "Rita Nogueira", "rita@example.org");

    let grant = service.acquire_lock(&admin, id, t0()).expect("first lock");
    assert_eq!(grant.locked_by, admin.actor_id);
    assert_eq!(grant.expires_at, t0() + Duration::minutes(5));

    match service.acquire_lock(&member, id, t0() + Duration::minutes(4)) {
        Err(RecruitmentError::Lock(conflict)) => {
            assert_eq!(conflict.holder, admin.actor_id);
            assert_eq!(conflict.holder_name, "Ana Costa");
            assert_eq!(conflict.to_string(), "Locked by Ana Costa");
        }
        other => panic!("expected lock conflict, got {other:?}"),
    }

    let takeover = service
        .acquire_lock(&member, id, t0() + Duration::minutes(6))
        .expect("stale lock is taken over");
    assert_eq!(takeover.locked_by, member.actor_id);
}

#[test]
fn holder_refreshes_its_own_lock() {
    let (service, store, _) = build_service();
    let (_, evaluator, _) = seed_team(&store);
    let id = seed_candidate(&service, &evaluator, "Rita Nogueira", "rita@example.org");

    service.acquire_lock(&evaluator, id, t0()).expect("lock");
    let refreshed = service
        .acquire_lock(&evaluator, id, t0() + Duration::minutes(1))
        .expect("same actor re-acquires");
    assert_eq!(refreshed.locked_at, t0() + Duration::minutes(1));
}

#[test]
fn conflict_is_classified_as_lock_conflict() {
    let (service, store, _) = build_service();
    let (admin, evaluator, _) = seed_team(&store);
    let id = seed_candidate(&service, &evaluator, "Rita Nogueira", "rita@example.org");

    service.acquire_lock(&admin, id, t0()).expect("lock");
    let err = service
        .acquire_lock(&evaluator, id, t0() + Duration::seconds(30))
        .expect_err("conflict");
    assert_eq!(err.kind(), ErrorKind::LockConflict);
}

#[test]
fn open_degrades_to_read_only_on_conflict() {
    let (service, store, _) = build_service();
    let (admin, evaluator, member) = seed_team(&store);
    let id = seed_candidate(&service, &evaluator, "Rita Nogueira", "rita@example.org");

    let opened = service.open_candidate(&admin, id, t0()).expect("open");
    assert!(opened.editable);
    assert!(opened.lock.is_some());

    let read_only = service
        .open_candidate(&member, id, t0() + Duration::minutes(2))
        .expect("conflict is not fatal");
    assert!(!read_only.editable);
    assert_eq!(read_only.locked_by.as_deref(), Some("Ana Costa"));
    assert_eq!(read_only.candidate.profile().full_name, "Rita Nogueira");
}

#[test]
fn removed_holder_no_longer_blocks() {
    let (service, store, _) = build_service();
    let (admin, evaluator, member) = seed_team(&store);
    let id = seed_candidate(&service, &evaluator, "Rita Nogueira", "rita@example.org");

    service.acquire_lock(&member, id, t0()).expect("lock");
    service
        .remove_actor(&admin, member.actor_id)
        .expect("member removed");

    service
        .acquire_lock(&evaluator, id, t0() + Duration::seconds(10))
        .expect("lock cleared with its holder");
}

#[test]
fn locking_unknown_candidate_is_not_found() {
    let (service, store, _) = build_service();
    let (admin, _, _) = seed_team(&store);
    let err = service
        .acquire_lock(&admin, CandidateId(404), t0())
        .expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
