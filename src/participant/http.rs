//! HTTP API for a participant
//!
//! Coordinator-facing: `POST /rpc/prepare`, `POST /rpc/commit`, `POST /rpc/abort`,
//! `GET /rpc/info`. Client-facing: `GET|PUT|DELETE /kv/:key`, and the same on
//! `/kv?key=` for keys that cannot travel as a path segment (`.`, `..`, `a\b`).

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{DeleteOutcome, GetOutcome, PhaseRequest, PutOutcome};
use crate::participant::Participant;
use crate::transport::wire::{
    AckResponse, ClientQuery, ClientReply, InfoResponse, KeyQuery, PutBody, VoteResponse,
    ABORT_PATH, COMMIT_PATH, INFO_PATH, KV_PATH, PREPARE_PATH,
};

#[derive(Clone)]
pub struct ParticipantState {
    pub participant: Arc<Participant>,
    /// Name lookups must ask for to resolve this participant
    pub service_name: String,
}

pub fn create_router(state: ParticipantState) -> Router {
    Router::new()
        .route(PREPARE_PATH, post(prepare))
        .route(COMMIT_PATH, post(commit))
        .route(ABORT_PATH, post(abort))
        .route(INFO_PATH, get(info))
        .route(KV_PATH, get(get_keyed).put(put_keyed).delete(delete_keyed))
        .route(
            &format!("{}/:key", KV_PATH),
            get(get_key).put(put_key).delete(delete_key),
        )
        .layer(middleware::from_fn(request_tracing_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn prepare(
    State(state): State<ParticipantState>,
    Json(req): Json<PhaseRequest>,
) -> Json<VoteResponse> {
    let vote = state.participant.prepare(&req).await;
    Json(VoteResponse { vote })
}

async fn commit(
    State(state): State<ParticipantState>,
    Json(req): Json<PhaseRequest>,
) -> Json<AckResponse> {
    state.participant.commit(&req).await;
    Json(AckResponse { ok: true })
}

async fn abort(State(state): State<ParticipantState>) -> Json<AckResponse> {
    state.participant.abort().await;
    Json(AckResponse { ok: true })
}

async fn info(State(state): State<ParticipantState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: state.service_name.clone(),
        port: state.participant.port(),
    })
}

async fn get_key(
    State(state): State<ParticipantState>,
    Path(key): Path<String>,
    Query(query): Query<ClientQuery>,
) -> (StatusCode, Json<ClientReply<GetOutcome>>) {
    get_reply(&state, &key, &query.client).await
}

async fn get_keyed(
    State(state): State<ParticipantState>,
    Query(query): Query<KeyQuery>,
) -> (StatusCode, Json<ClientReply<GetOutcome>>) {
    get_reply(&state, &query.key, &query.client).await
}

async fn put_key(
    State(state): State<ParticipantState>,
    Path(key): Path<String>,
    Json(body): Json<PutBody>,
) -> (StatusCode, Json<ClientReply<PutOutcome>>) {
    put_reply(&state, &key, &body).await
}

async fn put_keyed(
    State(state): State<ParticipantState>,
    Query(query): Query<KeyQuery>,
    Json(body): Json<PutBody>,
) -> (StatusCode, Json<ClientReply<PutOutcome>>) {
    put_reply(&state, &query.key, &body).await
}

async fn delete_key(
    State(state): State<ParticipantState>,
    Path(key): Path<String>,
    Query(query): Query<ClientQuery>,
) -> (StatusCode, Json<ClientReply<DeleteOutcome>>) {
    delete_reply(&state, &key, &query.client).await
}

async fn delete_keyed(
    State(state): State<ParticipantState>,
    Query(query): Query<KeyQuery>,
) -> (StatusCode, Json<ClientReply<DeleteOutcome>>) {
    delete_reply(&state, &query.key, &query.client).await
}

async fn get_reply(
    state: &ParticipantState,
    key: &str,
    client: &str,
) -> (StatusCode, Json<ClientReply<GetOutcome>>) {
    let outcome = state.participant.get(key, client).await;
    let status = match outcome {
        GetOutcome::Found { .. } => StatusCode::OK,
        GetOutcome::NotFound { .. } => StatusCode::NOT_FOUND,
    };
    (status, Json(ClientReply::new(outcome)))
}

async fn put_reply(
    state: &ParticipantState,
    key: &str,
    body: &PutBody,
) -> (StatusCode, Json<ClientReply<PutOutcome>>) {
    let outcome = state.participant.put(key, &body.value, &body.client).await;
    let status = match outcome {
        PutOutcome::Stored { .. } => StatusCode::OK,
        PutOutcome::Aborted => StatusCode::CONFLICT,
        PutOutcome::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ClientReply::new(outcome)))
}

async fn delete_reply(
    state: &ParticipantState,
    key: &str,
    client: &str,
) -> (StatusCode, Json<ClientReply<DeleteOutcome>>) {
    let outcome = state.participant.delete(key, client).await;
    let status = match outcome {
        DeleteOutcome::Deleted { .. } => StatusCode::OK,
        DeleteOutcome::NotFound => StatusCode::NOT_FOUND,
        DeleteOutcome::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ClientReply::new(outcome)))
}
