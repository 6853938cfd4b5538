use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::pipeline::access::{AccessLevel, Caller};
use crate::pipeline::domain::{CandidateId, NewActor, NewCandidate};
use crate::pipeline::outreach::{DispatchError, EmailDispatcher, OutboundEmail};
use crate::pipeline::repository::ActorRepository;
use crate::pipeline::store::SqliteStore;
use crate::pipeline::{recruitment_router, RecruitmentService, SoftLockPolicy};

pub(super) type TestService = RecruitmentService<SqliteStore, RecordingDispatcher>;

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn build_service() -> (TestService, Arc<SqliteStore>, Arc<RecordingDispatcher>) {
    let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = RecruitmentService::new(
        store.clone(),
        dispatcher.clone(),
        SoftLockPolicy::default(),
    );
    (service, store, dispatcher)
}

pub(super) fn seed_actor(store: &SqliteStore, name: &str, level: AccessLevel) -> Caller {
    let email = format!("{}@team.example.org", name.to_ascii_lowercase().replace(' ', "."));
    let actor = store
        .insert_actor(
            &NewActor {
                full_name: name.to_string(),
                email,
                access_level: level,
                department: Some("People".to_string()),
                credential_hash: None,
            },
            Utc::now(),
        )
        .expect("seed actor");
    Caller::new(actor.id, actor.access_level)
}

/// Admin, evaluator, and member callers in that order.
pub(super) fn seed_team(store: &SqliteStore) -> (Caller, Caller, Caller) {
    (
        seed_actor(store, "Ana Costa", AccessLevel::Admin),
        seed_actor(store, "Bruno Dias", AccessLevel::Evaluator),
        seed_actor(store, "Carla Reis", AccessLevel::Member),
    )
}

pub(super) fn new_candidate(name: &str, email: &str) -> NewCandidate {
    NewCandidate {
        full_name: name.to_string(),
        email: email.to_string(),
        phone: Some("+351 910 000 000".to_string()),
        degree_type: Some("Bachelor".to_string()),
        track_id: None,
    }
}

pub(super) fn seed_candidate(
    service: &TestService,
    caller: &Caller,
    name: &str,
    email: &str,
) -> CandidateId {
    service
        .create_candidate(caller, new_candidate(name, email))
        .expect("seed candidate")
        .profile()
        .id
}

/// Records every email and rejects recipients on the reserved `.invalid` TLD.
#[derive(Default, Clone)]
pub(super) struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl RecordingDispatcher {
    pub(super) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl EmailDispatcher for RecordingDispatcher {
    fn dispatch(&self, email: &OutboundEmail) -> Result<(), DispatchError> {
        if email.recipient.ends_with(".invalid") {
            return Err(DispatchError::Rejected(email.recipient.clone()));
        }
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(email.clone());
        Ok(())
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    recruitment_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
