//! Coordinator server

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::common::{split_addrs, CoordinatorConfig, Result};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::Coordinator;

pub struct CoordinatorServer {
    config: CoordinatorConfig,
    node_id: String,
}

impl CoordinatorServer {
    pub fn new(config: CoordinatorConfig, node_id: String) -> Self {
        Self { config, node_id }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting coordinator: {}", self.node_id);
        tracing::info!("  RPC API: {}", self.config.bind_addr);
        tracing::info!("  Service name: {}", self.config.service_name);
        tracing::info!("  Participants: {:?}", self.config.participants);

        let (hosts, ports) = split_addrs(&self.config.participants)?;
        let coordinator = Arc::new(Coordinator::over_http(self.config.prepare_timeout()));

        let listener = TcpListener::bind(self.config.bind_addr).await?;

        // Participants may still be starting; connect in the background.
        if !hosts.is_empty() {
            let coordinator = coordinator.clone();
            let service_name = self.config.service_name.clone();
            tokio::spawn(async move {
                match coordinator
                    .connect_to_participants(&hosts, &ports, &service_name)
                    .await
                {
                    Ok(n) => tracing::info!("Connected to {} of {} participants", n, hosts.len()),
                    Err(e) => tracing::error!("Connecting to participants failed: {}", e),
                }
            });
        }

        tracing::info!("✓ Coordinator ready");
        serve_coordinator(listener, coordinator, crate::common::utils::shutdown_signal()).await
    }
}

/// Serve the coordinator API on `listener` until `shutdown` resolves
pub async fn serve_coordinator(
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(CoordState { coordinator });
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
