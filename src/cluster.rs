//! Single-process launcher: one coordinator plus N participants over HTTP
//!
//! The coordinator binds `host:base_port`, participant `i` binds
//! `host:base_port + i`, every participant answers for the same service name,
//! and the coordinator connects to all of them before `start` returns.
//! A `base_port` of 0 gives every server a free port instead.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::common::{ClusterConfig, Error, Result};
use crate::coordinator::{serve_coordinator, Coordinator};
use crate::participant::{serve_participant, Participant};
use crate::transport::HttpCoordinatorClient;

pub struct ClusterMember {
    pub participant: Arc<Participant>,
    pub addr: SocketAddr,
}

pub struct LocalCluster {
    pub coordinator: Arc<Coordinator>,
    pub coordinator_addr: SocketAddr,
    pub members: Vec<ClusterMember>,
    shutdown: Vec<oneshot::Sender<()>>,
    servers: Vec<JoinHandle<Result<()>>>,
}

impl LocalCluster {
    pub async fn start(config: &ClusterConfig) -> Result<Self> {
        config.validate()?;

        let mut shutdown = Vec::with_capacity(config.participants + 1);
        let mut servers = Vec::with_capacity(config.participants + 1);

        let coordinator = Arc::new(Coordinator::over_http(config.prepare_timeout()));

        let listener = TcpListener::bind((config.host.as_str(), config.base_port)).await?;
        let coordinator_addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel();
        shutdown.push(tx);
        servers.push(tokio::spawn(serve_coordinator(
            listener,
            coordinator.clone(),
            shutdown_on(rx),
        )));
        tracing::info!("Coordinator listening on {}", coordinator_addr);

        let coordinator_client =
            Arc::new(HttpCoordinatorClient::new(format!("http://{}", coordinator_addr), None)?);

        let mut members = Vec::with_capacity(config.participants);
        for i in 1..=config.participants {
            let port = if config.base_port == 0 {
                0
            } else {
                u16::try_from(usize::from(config.base_port) + i)
                    .map_err(|_| Error::InvalidConfig("participant port out of range".into()))?
            };
            let listener = TcpListener::bind((config.host.as_str(), port)).await?;
            let addr = listener.local_addr()?;
            let participant = Arc::new(Participant::new(addr.port(), coordinator_client.clone()));

            let (tx, rx) = oneshot::channel();
            shutdown.push(tx);
            servers.push(tokio::spawn(serve_participant(
                listener,
                participant.clone(),
                config.service_name.clone(),
                shutdown_on(rx),
            )));
            tracing::info!("Participant {} listening on {}", i, addr);
            members.push(ClusterMember { participant, addr });
        }

        let hosts = vec![config.host.clone(); members.len()];
        let ports: Vec<u16> = members.iter().map(|m| m.addr.port()).collect();
        let connected = coordinator
            .connect_to_participants(&hosts, &ports, &config.service_name)
            .await?;
        tracing::info!(
            "Servers ready... ({} of {} participants connected)",
            connected,
            members.len()
        );

        Ok(Self {
            coordinator,
            coordinator_addr,
            members,
            shutdown,
            servers,
        })
    }

    pub fn participant_addrs(&self) -> Vec<SocketAddr> {
        self.members.iter().map(|m| m.addr).collect()
    }

    /// Stop every server and wait for them to finish
    pub async fn shutdown(self) -> Result<()> {
        for tx in self.shutdown {
            let _ = tx.send(());
        }
        for server in self.servers {
            server
                .await
                .map_err(|e| Error::Internal(format!("server task failed: {}", e)))??;
        }
        Ok(())
    }
}

async fn shutdown_on(rx: oneshot::Receiver<()>) {
    let _ = rx.await;
}
