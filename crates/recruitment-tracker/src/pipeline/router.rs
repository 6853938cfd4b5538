use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::access::{AccessLevel, Caller};
use super::domain::{
    ActorId, CandidateFilter, CandidateId, CandidatePatch, CandidateSort, NewActor, NewCandidate,
    SortDirection, TrackId,
};
use super::ledger::EvaluationInput;
use super::outreach::{BulkEmailRequest, EmailDispatcher, EmailTemplate};
use super::repository::RecruitmentStore;
use super::roster::{RosterCsv, RosterRow};
use super::service::{ErrorKind, RecruitmentError, RecruitmentService};
use super::stage::{Decision, Stage};

/// Header carrying the actor id resolved by the auth provider.
pub const ACTOR_HEADER: &str = "x-actor-id";

type SharedService<S, D> = Arc<RecruitmentService<S, D>>;

/// Router builder exposing the recruitment API under `/api`.
pub fn recruitment_router<S, D>(service: SharedService<S, D>) -> Router
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/candidates",
            get(list_candidates_handler::<S, D>).post(create_candidate_handler::<S, D>),
        )
        .route("/api/candidates/import", post(import_handler::<S, D>))
        .route(
            "/api/candidates/bulk-delete",
            post(bulk_delete_handler::<S, D>),
        )
        .route(
            "/api/candidates/:id",
            get(get_candidate_handler::<S, D>)
                .put(update_candidate_handler::<S, D>)
                .delete(delete_candidate_handler::<S, D>),
        )
        .route("/api/candidates/:id/lock", post(lock_handler::<S, D>))
        .route("/api/candidates/:id/open", post(open_handler::<S, D>))
        .route(
            "/api/candidates/:id/decision",
            post(decision_handler::<S, D>),
        )
        .route(
            "/api/candidates/:id/evaluations",
            get(history_handler::<S, D>).post(evaluate_handler::<S, D>),
        )
        .route("/api/evaluations", post(evaluate_and_advance_handler::<S, D>))
        .route("/api/stats", get(stats_handler::<S, D>))
        .route(
            "/api/tracks",
            get(list_tracks_handler::<S, D>).post(create_track_handler::<S, D>),
        )
        .route(
            "/api/tracks/:id/activate",
            put(activate_track_handler::<S, D>),
        )
        .route(
            "/api/tracks/:id",
            axum::routing::delete(delete_track_handler::<S, D>),
        )
        .route(
            "/api/users",
            get(list_actors_handler::<S, D>).post(register_actor_handler::<S, D>),
        )
        .route(
            "/api/users/:id/access-level",
            put(access_level_handler::<S, D>),
        )
        .route(
            "/api/users/:id",
            axum::routing::delete(remove_actor_handler::<S, D>),
        )
        .route("/api/emails/template", get(template_handler::<S, D>))
        .route("/api/emails/templates", put(save_template_handler::<S, D>))
        .route("/api/emails/bulk", post(bulk_email_handler::<S, D>))
        .with_state(service)
}

/// Maps service errors onto status codes and a `{ error, kind }` body.
pub fn error_response(error: RecruitmentError) -> Response {
    let status = match &error {
        RecruitmentError::Unauthenticated => StatusCode::UNAUTHORIZED,
        other => match other.kind() {
            ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::LockConflict | ErrorKind::IntegrityViolation => StatusCode::CONFLICT,
            ErrorKind::AuthorizationError => StatusCode::FORBIDDEN,
            ErrorKind::DependencyFailure => StatusCode::SERVICE_UNAVAILABLE,
        },
    };

    let payload = match &error {
        RecruitmentError::Lock(conflict) => json!({
            "error": error.to_string(),
            "kind": error.kind().label(),
            "locked_by": conflict.holder_name,
            "holder_id": conflict.holder,
        }),
        _ => json!({
            "error": error.to_string(),
            "kind": error.kind().label(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}

fn respond<T>(status: StatusCode, result: Result<T, RecruitmentError>) -> Response
where
    T: serde::Serialize,
{
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

fn caller_from_headers<S, D>(
    service: &RecruitmentService<S, D>,
    headers: &HeaderMap,
) -> Result<Caller, RecruitmentError>
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let actor_id = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or(RecruitmentError::Unauthenticated)?;
    service.resolve_caller(ActorId(actor_id))
}

/// Resolves the caller and runs `call` on the blocking pool. Store calls can wait
/// on the SQLite busy timeout and must stay off the runtime workers.
async fn run_blocking<S, D, T, F>(
    service: SharedService<S, D>,
    headers: HeaderMap,
    call: F,
) -> Result<T, RecruitmentError>
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
    T: Send + 'static,
    F: FnOnce(&RecruitmentService<S, D>, Caller) -> Result<T, RecruitmentError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let caller = caller_from_headers(&service, &headers)?;
        call(&service, caller)
    })
    .await
    .map_err(|err| RecruitmentError::Dependency(format!("request task failed: {err}")))?
}

fn json_body<T>(payload: Result<axum::Json<T>, JsonRejection>) -> Result<T, RecruitmentError> {
    payload
        .map(|axum::Json(value)| value)
        .map_err(|rejection| {
            RecruitmentError::Validation(format!("invalid request body: {}", rejection.body_text()))
        })
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, RecruitmentError> {
    query.map(|Query(value)| value).map_err(|rejection| {
        RecruitmentError::Validation(format!("invalid query string: {}", rejection.body_text()))
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ListQuery {
    stage: Option<String>,
    degree: Option<String>,
    track: Option<i64>,
    sort: Option<String>,
    order: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<CandidateFilter, RecruitmentError> {
        let stage = match self.stage.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(label.parse::<Stage>()?),
        };
        Ok(CandidateFilter {
            stage,
            degree: self.degree,
            track: self.track.map(TrackId),
            sort: self
                .sort
                .as_deref()
                .map(CandidateSort::from_param)
                .unwrap_or_default(),
            order: self
                .order
                .as_deref()
                .map(SortDirection::from_param)
                .unwrap_or_default(),
        })
    }
}

pub(crate) async fn list_candidates_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let query = query_params(query);
    let result = run_blocking(service, headers, move |service, caller| {
        let filter = query?.into_filter()?;
        service.list_candidates(&caller, &filter)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_candidate_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewCandidate>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let candidate = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.create_candidate(&caller, candidate?)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

/// Accepts either a CSV export (`text/csv`) or a JSON array of rows.
pub(crate) async fn import_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let is_csv = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/csv"))
        .unwrap_or(false);

    let result = run_blocking(service, headers, move |service, caller| {
        let rows: Vec<RosterRow> = if is_csv {
            RosterCsv::from_reader(body.as_bytes())?
        } else {
            serde_json::from_str(&body).map_err(|err| {
                RecruitmentError::Validation(format!("invalid roster payload: {err}"))
            })?
        };
        service.import_roster(&caller, rows)
    })
    .await;
    respond(StatusCode::OK, result)
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkDeleteRequest {
    ids: Vec<i64>,
}

pub(crate) async fn bulk_delete_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    payload: Result<axum::Json<BulkDeleteRequest>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let request = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        let ids: Vec<CandidateId> = request?.ids.into_iter().map(CandidateId).collect();
        service.bulk_delete_candidates(&caller, &ids)
    })
    .await
    .map(|deleted| json!({ "deleted": deleted }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn get_candidate_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.get_candidate(&caller, CandidateId(id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn update_candidate_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<axum::Json<CandidatePatch>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let patch = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.update_candidate(&caller, CandidateId(id), patch?)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_candidate_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.delete_candidate(&caller, CandidateId(id))
    })
    .await
    .map(|()| json!({ "message": "Candidate deleted" }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn lock_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.acquire_lock(&caller, CandidateId(id), Utc::now())
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn open_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.open_candidate(&caller, CandidateId(id), Utc::now())
    })
    .await;
    respond(StatusCode::OK, result)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    decision: Decision,
}

pub(crate) async fn decision_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<axum::Json<DecisionRequest>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let request = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.apply_decision(&caller, CandidateId(id), request?.decision)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn history_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.history(&caller, CandidateId(id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn evaluate_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<axum::Json<EvaluationInput>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let input = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.record_evaluation(&caller, CandidateId(id), input?)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdvanceRequest {
    candidate_id: i64,
    #[serde(flatten)]
    input: EvaluationInput,
}

pub(crate) async fn evaluate_and_advance_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    payload: Result<axum::Json<AdvanceRequest>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let request = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        let request = request?;
        service.record_evaluation_and_advance(
            &caller,
            CandidateId(request.candidate_id),
            request.input,
        )
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn stats_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, |service, caller| service.stats(&caller)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_tracks_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result =
        run_blocking(service, headers, |service, caller| service.list_tracks(&caller)).await;
    respond(StatusCode::OK, result)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackRequest {
    name: String,
}

pub(crate) async fn create_track_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    payload: Result<axum::Json<TrackRequest>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let request = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.create_track(&caller, &request?.name)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn activate_track_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.activate_track(&caller, TrackId(id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_track_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.delete_track(&caller, TrackId(id))
    })
    .await
    .map(|()| json!({ "message": "Track deleted" }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_actors_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result =
        run_blocking(service, headers, |service, caller| service.list_actors(&caller)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn register_actor_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewActor>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let actor = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.register_actor(&caller, actor?)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessLevelRequest {
    access_level: AccessLevel,
}

pub(crate) async fn access_level_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<axum::Json<AccessLevelRequest>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let request = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.set_access_level(&caller, ActorId(id), request?.access_level)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn remove_actor_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let result = run_blocking(service, headers, move |service, caller| {
        service.remove_actor(&caller, ActorId(id))
    })
    .await
    .map(|()| json!({ "message": "User deleted" }));
    respond(StatusCode::OK, result)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateQuery {
    stage: String,
}

pub(crate) async fn template_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    query: Result<Query<TemplateQuery>, QueryRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let query = query_params(query);
    let result = run_blocking(service, headers, move |service, caller| {
        let stage: Stage = query?.stage.parse()?;
        service.template_for_stage(&caller, stage)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn save_template_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    payload: Result<axum::Json<EmailTemplate>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let template = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.save_template(&caller, template?)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn bulk_email_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    payload: Result<axum::Json<BulkEmailRequest>, JsonRejection>,
) -> Response
where
    S: RecruitmentStore + 'static,
    D: EmailDispatcher + 'static,
{
    let request = json_body(payload);
    let result = run_blocking(service, headers, move |service, caller| {
        service.send_bulk(&caller, request?)
    })
    .await
    .map(|summary| json!({ "message": "Bulk dispatch complete", "summary": summary }));
    respond(StatusCode::OK, result)
}
