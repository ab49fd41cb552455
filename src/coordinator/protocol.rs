//! Coordinator: drives one prepare → commit-or-abort round per write
//!
//! Prepares go out sequentially in membership order. The first refusal or
//! communication failure stops the vote and every replica, asked or not, is
//! sent an abort. Once every vote is yes the commit broadcast is best-effort:
//! failures are logged and the round still reports success.
//!
//! Rounds are serialized by `round`, so at most one transaction is in flight.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn, Instrument};

use crate::common::{Error, ParticipantInfo, PhaseRequest, Result, TxnRequest};
use crate::transport::{CoordinatorRpc, HttpRegistry, ParticipantRpc, Registry, TransportError};

#[derive(Clone)]
struct Replica {
    info: ParticipantInfo,
    handle: Arc<dyn ParticipantRpc>,
}

pub struct Coordinator {
    registry: Arc<dyn Registry>,
    replicas: RwLock<Vec<Replica>>,
    round: Mutex<()>,
    prepare_timeout: Option<Duration>,
}

impl Coordinator {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            replicas: RwLock::new(Vec::new()),
            round: Mutex::new(()),
            prepare_timeout: None,
        }
    }

    /// Bound every prepare call. A replica that misses the deadline counts as
    /// a failed vote and the round aborts.
    pub fn with_prepare_timeout(mut self, timeout: Duration) -> Self {
        self.prepare_timeout = Some(timeout);
        self
    }

    /// Coordinator resolving participants over HTTP, with an optional prepare deadline
    pub fn over_http(prepare_timeout: Option<Duration>) -> Self {
        let coordinator = Self::new(Arc::new(HttpRegistry::default()));
        match prepare_timeout {
            Some(timeout) => coordinator.with_prepare_timeout(timeout),
            None => coordinator,
        }
    }

    /// Resolve each `(host, port)` and append it to the replica set.
    ///
    /// An address that cannot be resolved is logged and skipped. Returns how
    /// many replicas this call added.
    pub async fn connect_to_participants(
        &self,
        hosts: &[String],
        ports: &[u16],
        service_name: &str,
    ) -> Result<usize> {
        if hosts.len() != ports.len() {
            return Err(Error::InvalidConfig(format!(
                "{} hosts but {} ports",
                hosts.len(),
                ports.len()
            )));
        }

        let mut connected = 0;
        for (host, &port) in hosts.iter().zip(ports) {
            let info = ParticipantInfo::new(host.as_str(), port);
            match self.registry.lookup(host, port, service_name).await {
                Ok(handle) => {
                    info!("Connected to participant at {}", info);
                    self.register(info, handle).await;
                    connected += 1;
                }
                Err(e) => {
                    warn!("Failed to connect to participant at {}: {}", info, e);
                }
            }
        }
        Ok(connected)
    }

    /// Append an already resolved replica to the end of the set
    pub async fn register(&self, info: ParticipantInfo, handle: Arc<dyn ParticipantRpc>) {
        self.replicas.write().await.push(Replica { info, handle });
    }

    /// Membership in broadcast order
    pub async fn replicas(&self) -> Vec<ParticipantInfo> {
        self.replicas
            .read()
            .await
            .iter()
            .map(|r| r.info.clone())
            .collect()
    }

    /// Run a full two-phase round. `true` means every replica voted yes and
    /// the commit was broadcast.
    pub async fn initiate_prepare_phase(&self, txn: TxnRequest) -> bool {
        let _round = self.round.lock().await;
        let replicas = self.replicas.read().await.clone();

        let span = tracing::info_span!("round", op = %txn.operation, key = %txn.key);
        async {
            info!("Initiating prepare phase for operation: {}", txn.operation);

            for replica in &replicas {
                match self.prepare_one(replica, &txn).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!("{} voted no. Aborting transaction.", replica.info);
                        Self::send_abort_to_all(&replicas).await;
                        return false;
                    }
                    Err(e) => {
                        warn!(
                            "Prepare phase failed at {}: {}. Aborting transaction.",
                            replica.info, e
                        );
                        Self::send_abort_to_all(&replicas).await;
                        return false;
                    }
                }
            }

            info!("Prepare phase successful. Committing transaction.");
            Self::send_commit_to_all(&replicas, &txn).await;
            true
        }
        .instrument(span)
        .await
    }

    async fn prepare_one(
        &self,
        replica: &Replica,
        txn: &TxnRequest,
    ) -> std::result::Result<bool, TransportError> {
        let request = PhaseRequest {
            txn: txn.clone(),
            port: replica.info.port,
        };
        let vote = replica.handle.prepare(request);
        match self.prepare_timeout {
            Some(timeout) => tokio::time::timeout(timeout, vote)
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => vote.await,
        }
    }

    async fn send_abort_to_all(replicas: &[Replica]) {
        for replica in replicas {
            match replica.handle.abort().await {
                Ok(()) => info!("Abort message sent successfully to {}", replica.info),
                Err(e) => warn!("Failed to send abort to {}: {}", replica.info, e),
            }
        }
    }

    async fn send_commit_to_all(replicas: &[Replica], txn: &TxnRequest) {
        for replica in replicas {
            let request = PhaseRequest {
                txn: txn.clone(),
                port: replica.info.port,
            };
            match replica.handle.commit(request).await {
                Ok(()) => info!("Commit message sent successfully to {}", replica.info),
                Err(e) => warn!("Failed to send commit to {}: {}", replica.info, e),
            }
        }
    }
}

#[async_trait]
impl CoordinatorRpc for Coordinator {
    async fn initiate_prepare_phase(
        &self,
        txn: TxnRequest,
    ) -> std::result::Result<bool, TransportError> {
        Ok(Coordinator::initiate_prepare_phase(self, txn).await)
    }
}
