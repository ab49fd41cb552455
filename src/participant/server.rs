//! Participant server

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::common::{ParticipantConfig, Result};
use crate::participant::http::{create_router, ParticipantState};
use crate::participant::Participant;
use crate::transport::HttpCoordinatorClient;

pub struct ParticipantServer {
    config: ParticipantConfig,
    node_id: String,
}

impl ParticipantServer {
    pub fn new(config: ParticipantConfig, node_id: String) -> Self {
        Self { config, node_id }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting participant: {}", self.node_id);
        tracing::info!("  API: {}", self.config.bind_addr);
        tracing::info!("  Coordinator: {}", self.config.coordinator_url);
        tracing::info!("  Service name: {}", self.config.service_name);

        let coordinator =
            HttpCoordinatorClient::new(&self.config.coordinator_url, self.config.rpc_timeout())?;

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let port = listener.local_addr()?.port();
        let participant = Arc::new(Participant::new(port, Arc::new(coordinator)));

        tracing::info!("✓ Participant ready");
        serve_participant(
            listener,
            participant,
            self.config.service_name,
            crate::common::utils::shutdown_signal(),
        )
        .await
    }
}

/// Serve a participant on `listener` until `shutdown` resolves
pub async fn serve_participant(
    listener: TcpListener,
    participant: Arc<Participant>,
    service_name: String,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(ParticipantState {
        participant,
        service_name,
    });
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
