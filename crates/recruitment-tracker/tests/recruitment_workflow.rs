//! Integration specifications for a full recruitment cycle.
//!
//! Scenarios go through the public service facade backed by a SQLite file so the
//! schema, soft locks, and ledger are exercised the way the API binary uses them.

mod common {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use recruitment_tracker::pipeline::{
        AccessLevel, ActorRepository, Caller, DispatchError, EmailDispatcher, NewActor,
        OutboundEmail, RecruitmentService, SoftLockPolicy, SqliteStore,
    };

    #[derive(Default)]
    pub(super) struct Outbox {
        pub(super) messages: Mutex<Vec<OutboundEmail>>,
    }

    impl EmailDispatcher for Outbox {
        fn dispatch(&self, email: &OutboundEmail) -> Result<(), DispatchError> {
            self.messages
                .lock()
                .expect("outbox mutex poisoned")
                .push(email.clone());
            Ok(())
        }
    }

    pub(super) struct Harness {
        pub(super) service: RecruitmentService<SqliteStore, Outbox>,
        pub(super) store: Arc<SqliteStore>,
        pub(super) outbox: Arc<Outbox>,
        pub(super) path: PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    pub(super) fn harness(name: &str) -> Harness {
        let path = std::env::temp_dir().join(format!(
            "recruitment-{name}-{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = Arc::new(SqliteStore::open(&path).expect("open database file"));
        let outbox = Arc::new(Outbox::default());
        let service =
            RecruitmentService::new(store.clone(), outbox.clone(), SoftLockPolicy::default());
        Harness {
            service,
            store,
            outbox,
            path,
        }
    }

    pub(super) fn member(
        store: &SqliteStore,
        name: &str,
        email: &str,
        level: AccessLevel,
    ) -> Caller {
        let actor = store
            .insert_actor(
                &NewActor {
                    full_name: name.to_string(),
                    email: email.to_string(),
                    access_level: level,
                    department: Some("Recruitment".to_string()),
                    credential_hash: None,
                },
                Utc::now(),
            )
            .expect("insert member");
        Caller::new(actor.id, actor.access_level)
    }
}

use chrono::{Duration, Utc};

use common::{harness, member};
use recruitment_tracker::pipeline::{
    AccessLevel, BulkEmailRequest, CandidateFilter, CandidateRepository, Decision, EmailTemplate,
    ErrorKind, EvaluationInput, NewCandidate, RosterRow, SqliteStore, Stage,
};

#[test]
fn candidate_moves_from_forms_to_approved() {
    let h = harness("cycle");
    let admin = member(&h.store, "Inês Faria", "ines@team.example.org", AccessLevel::Admin);
    let reviewer = member(&h.store, "João Lima", "joao@team.example.org", AccessLevel::Evaluator);

    let track = h.service.create_track(&admin, "Autumn 2025").expect("track");
    let view = h
        .service
        .create_candidate(
            &reviewer,
            NewCandidate {
                full_name: "Beatriz Neves".to_string(),
                email: "beatriz@example.org".to_string(),
                phone: None,
                degree_type: Some("Master".to_string()),
                track_id: Some(track.id),
            },
        )
        .expect("candidate");
    let id = view.profile().id;

    let opened = h
        .service
        .open_candidate(&reviewer, id, Utc::now())
        .expect("open");
    assert!(opened.editable);

    for (label, score) in [
        ("Phase 2 (Dynamics)", 4),
        ("Phase 3 (Interviews)", 5),
        ("Phase 4 (Motivational)", 4),
    ] {
        h.service
            .record_evaluation_and_advance(
                &reviewer,
                id,
                EvaluationInput {
                    score,
                    feedback: format!("ready for {label}"),
                    stage_label: label.to_string(),
                },
            )
            .expect("advance");
    }
    let transition = h
        .service
        .apply_decision(&reviewer, id, Decision::Pass)
        .expect("final pass");
    assert_eq!(transition.to, Stage::Approved);

    let history = h.service.history(&admin, id).expect("history");
    assert_eq!(history.len(), 3);
    assert_eq!(
        history.latest().map(|entry| entry.stage_evaluated.as_str()),
        Some("Phase 4 (Motivational)")
    );

    let stats = h.service.stats(&admin).expect("stats");
    assert_eq!(stats.count_for(Stage::Approved), 1);

    let listed = h
        .service
        .list_candidates(
            &admin,
            &CandidateFilter {
                track: Some(track.id),
                ..CandidateFilter::default()
            },
        )
        .expect("list");
    assert_eq!(listed.len(), 1);
}

#[test]
fn concurrent_editors_see_the_lock_until_it_goes_stale() {
    let h = harness("locks");
    let first = member(&h.store, "Inês Faria", "ines@team.example.org", AccessLevel::Admin);
    let second = member(&h.store, "João Lima", "joao@team.example.org", AccessLevel::Evaluator);
    let id = h
        .service
        .create_candidate(
            &first,
            NewCandidate {
                full_name: "Beatriz Neves".to_string(),
                email: "beatriz@example.org".to_string(),
                phone: None,
                degree_type: None,
                track_id: None,
            },
        )
        .expect("candidate")
        .profile()
        .id;

    let start = Utc::now();
    h.service.acquire_lock(&first, id, start).expect("first lock");

    let blocked = h
        .service
        .open_candidate(&second, id, start + Duration::minutes(2))
        .expect("read-only open");
    assert!(!blocked.editable);
    assert_eq!(blocked.locked_by.as_deref(), Some("Inês Faria"));

    let taken = h
        .service
        .acquire_lock(&second, id, start + Duration::minutes(6))
        .expect("stale lock is taken over");
    assert_eq!(taken.locked_by, second.actor_id);
}

#[test]
fn data_survives_reopening_the_database() {
    let h = harness("reopen");
    let admin = member(&h.store, "Inês Faria", "ines@team.example.org", AccessLevel::Admin);
    let summary = h
        .service
        .import_roster(
            &admin,
            vec![RosterRow {
                name: "Beatriz Neves".to_string(),
                email: "beatriz@example.org".to_string(),
                phone: Some("+351 913 000 000".to_string()),
                degree_type: None,
            }],
        )
        .expect("import");
    assert_eq!(summary.inserted, 1);

    let reopened = SqliteStore::open(&h.path).expect("reopen");
    let listed = reopened
        .list_candidates(&CandidateFilter::default())
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].email, "beatriz@example.org");
}

#[test]
fn rejected_candidates_receive_the_stage_template() {
    let h = harness("outreach");
    let admin = member(&h.store, "Inês Faria", "ines@team.example.org", AccessLevel::Admin);
    let id = h
        .service
        .create_candidate(
            &admin,
            NewCandidate {
                full_name: "Beatriz Neves".to_string(),
                email: "beatriz@example.org".to_string(),
                phone: None,
                degree_type: None,
                track_id: None,
            },
        )
        .expect("candidate")
        .profile()
        .id;
    h.service
        .apply_decision(&admin, id, Decision::Fail)
        .expect("reject");
    h.service
        .save_template(
            &admin,
            EmailTemplate::for_stage(
                Stage::Rejected,
                "About your application",
                "Dear {{full_name}},\n{{feedback}}",
            ),
        )
        .expect("template");

    let summary = h
        .service
        .send_bulk(
            &admin,
            BulkEmailRequest {
                stage: Stage::Rejected,
                ..BulkEmailRequest::default()
            },
        )
        .expect("bulk");
    assert_eq!(summary.sent, 1);

    let messages = h.outbox.messages.lock().expect("outbox mutex poisoned");
    assert_eq!(messages[0].subject, "About your application");
    assert!(messages[0].body.starts_with("Dear Beatriz Neves,"));

    let err = h
        .service
        .send_bulk(
            &admin,
            BulkEmailRequest {
                stage: Stage::Approved,
                ..BulkEmailRequest::default()
            },
        )
        .expect_err("no template, no text");
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}
