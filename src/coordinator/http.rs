//! HTTP API for the coordinator
//!
//! - `POST /coordinator/prepare`: run one two-phase round (called by participants)
//! - `POST /coordinator/connect`: add replicas to the set
//! - `GET /health`: membership and version

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::TxnRequest;
use crate::coordinator::Coordinator;
use crate::transport::wire::{
    ConnectRequest, ConnectResponse, ErrorResponse, HealthResponse, PrepareResponse,
    COORDINATOR_CONNECT_PATH, COORDINATOR_PREPARE_PATH, HEALTH_PATH,
};

#[derive(Clone)]
pub struct CoordState {
    pub coordinator: Arc<Coordinator>,
}

pub fn create_router(state: CoordState) -> Router {
    Router::new()
        .route(COORDINATOR_PREPARE_PATH, post(prepare_phase))
        .route(COORDINATOR_CONNECT_PATH, post(connect))
        .route(HEALTH_PATH, get(health))
        .layer(middleware::from_fn(request_tracing_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The round runs on its own task so a caller that disconnects mid-round
/// cannot stop it between the commits of two replicas.
async fn prepare_phase(
    State(state): State<CoordState>,
    Json(txn): Json<TxnRequest>,
) -> Result<Json<PrepareResponse>, (StatusCode, Json<ErrorResponse>)> {
    let coordinator = state.coordinator.clone();
    let round = tokio::spawn(async move { coordinator.initiate_prepare_phase(txn).await });
    match round.await {
        Ok(committed) => Ok(Json(PrepareResponse { committed })),
        Err(e) => {
            tracing::error!("Prepare round task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("round failed: {}", e),
                }),
            ))
        }
    }
}

async fn connect(
    State(state): State<CoordState>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, (StatusCode, Json<ErrorResponse>)> {
    let connected = state
        .coordinator
        .connect_to_participants(&req.hosts, &req.ports, &req.service_name)
        .await
        .map_err(|e| {
            (
                e.to_http_status(),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })?;

    Ok(Json(ConnectResponse {
        connected,
        replicas: replica_addrs(&state.coordinator).await,
    }))
}

async fn health(State(state): State<CoordState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        replicas: replica_addrs(&state.coordinator).await,
        version: crate::VERSION.to_string(),
    })
}

async fn replica_addrs(coordinator: &Coordinator) -> Vec<String> {
    coordinator
        .replicas()
        .await
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{
        DeleteOutcome, GetOutcome, ParticipantInfo, PhaseRequest, PutOutcome,
    };
    use crate::participant::Participant;
    use crate::transport::{CoordinatorRpc, LocalRegistry, ParticipantRpc, TransportError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::util::ServiceExt;

    struct Detached;

    #[async_trait]
    impl CoordinatorRpc for Detached {
        async fn initiate_prepare_phase(&self, _txn: TxnRequest) -> Result<bool, TransportError> {
            Ok(false)
        }
    }

    /// A replica whose commit takes half a second to land
    struct SlowCommit(Arc<Participant>);

    #[async_trait]
    impl ParticipantRpc for SlowCommit {
        async fn prepare(&self, req: PhaseRequest) -> Result<bool, TransportError> {
            Ok(self.0.prepare(&req).await)
        }

        async fn commit(&self, req: PhaseRequest) -> Result<(), TransportError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            self.0.commit(&req).await;
            Ok(())
        }

        async fn abort(&self) -> Result<(), TransportError> {
            self.0.abort().await;
            Ok(())
        }

        async fn get(&self, key: &str, client: &str) -> Result<GetOutcome, TransportError> {
            Ok(self.0.get(key, client).await)
        }

        async fn put(
            &self,
            key: &str,
            value: &str,
            client: &str,
        ) -> Result<PutOutcome, TransportError> {
            Ok(self.0.put(key, value, client).await)
        }

        async fn delete(&self, key: &str, client: &str) -> Result<DeleteOutcome, TransportError> {
            Ok(self.0.delete(key, client).await)
        }
    }

    async fn setup() -> (Router, Arc<Participant>) {
        let registry = Arc::new(LocalRegistry::new());
        let participant = Arc::new(Participant::new(5001, Arc::new(Detached)));
        registry
            .bind("localhost", 5001, "kv", participant.clone())
            .await;

        let coordinator = Arc::new(Coordinator::new(registry));
        let router = create_router(CoordState { coordinator });
        (router, participant)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_then_prepare_round() {
        let (app, participant) = setup().await;

        let request = post_json(
            COORDINATOR_CONNECT_PATH,
            serde_json::json!({
                "hosts": ["localhost", "localhost"],
                "ports": [5001, 5009],
                "service_name": "kv"
            }),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let result: ConnectResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.connected, 1);
        assert_eq!(result.replicas, vec!["localhost:5001"]);

        let request = post_json(
            COORDINATOR_PREPARE_PATH,
            serde_json::json!({"operation": "PUT", "key": "a", "value": "1"}),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let result: PrepareResponse = serde_json::from_slice(&body).unwrap();
        assert!(result.committed);
        assert_eq!(participant.snapshot().await.get("a").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_connect_with_mismatched_lists_is_bad_request() {
        let (app, _) = setup().await;
        let request = post_json(
            COORDINATOR_CONNECT_PATH,
            serde_json::json!({"hosts": ["localhost"], "ports": [], "service_name": "kv"}),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_lists_replicas() {
        let (app, _) = setup().await;
        let request = Request::builder()
            .uri(HEALTH_PATH)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let result: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.status, "healthy");
        assert!(result.replicas.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_finishes_after_caller_disconnects() {
        let participants: Vec<Arc<Participant>> = (0..3)
            .map(|i| Arc::new(Participant::new(5001 + i, Arc::new(Detached))))
            .collect();
        let coordinator = Arc::new(Coordinator::new(Arc::new(LocalRegistry::new())));
        for (i, participant) in participants.iter().enumerate() {
            let handle: Arc<dyn ParticipantRpc> = if i == 1 {
                Arc::new(SlowCommit(participant.clone()))
            } else {
                participant.clone()
            };
            coordinator
                .register(ParticipantInfo::new("localhost", 5001 + i as u16), handle)
                .await;
        }
        let app = create_router(CoordState { coordinator });

        // The caller gives up while the commit broadcast is still going
        let request = post_json(
            COORDINATOR_PREPARE_PATH,
            serde_json::json!({"operation": "PUT", "key": "k", "value": "v"}),
        );
        let response = tokio::time::timeout(Duration::from_millis(100), app.oneshot(request)).await;
        assert!(response.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        for (i, participant) in participants.iter().enumerate() {
            assert_eq!(
                participant.snapshot().await.get("k").map(String::as_str),
                Some("v"),
                "replica {} missed the commit",
                i
            );
            assert!(!participant.is_prepared().await, "replica {} left pending", i);
        }
    }
}
