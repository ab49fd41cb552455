//! In-process registry for running a whole cluster inside one runtime
//!
//! Every bound address has a reachability switch. While it is off, every
//! call through a handle for that address fails with `ConnectionFailed`,
//! which is how tests take a replica off the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::common::{DeleteOutcome, GetOutcome, ParticipantInfo, PhaseRequest, PutOutcome};
use crate::participant::Participant;
use crate::transport::{ParticipantRpc, Registry, TransportError};

struct Binding {
    service: String,
    participant: Arc<Participant>,
    reachable: Arc<AtomicBool>,
}

#[derive(Default)]
pub struct LocalRegistry {
    bindings: RwLock<HashMap<ParticipantInfo, Binding>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a participant under `service` at `host:port`, replacing any earlier binding
    pub async fn bind(
        &self,
        host: &str,
        port: u16,
        service: &str,
        participant: Arc<Participant>,
    ) {
        self.bindings.write().await.insert(
            ParticipantInfo::new(host, port),
            Binding {
                service: service.to_string(),
                participant,
                reachable: Arc::new(AtomicBool::new(true)),
            },
        );
    }

    /// Take an address off the network or put it back. Returns false if
    /// nothing is bound there.
    pub async fn set_reachable(&self, host: &str, port: u16, reachable: bool) -> bool {
        match self.bindings.read().await.get(&ParticipantInfo::new(host, port)) {
            Some(binding) => {
                binding.reachable.store(reachable, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Registry for LocalRegistry {
    async fn lookup(
        &self,
        host: &str,
        port: u16,
        service_name: &str,
    ) -> Result<Arc<dyn ParticipantRpc>, TransportError> {
        let info = ParticipantInfo::new(host, port);
        let bindings = self.bindings.read().await;
        let binding = bindings
            .get(&info)
            .ok_or_else(|| TransportError::NodeNotFound(info.to_string()))?;

        if !binding.reachable.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(format!("{} unreachable", info)));
        }
        if binding.service != service_name {
            return Err(TransportError::NotBound {
                service: service_name.to_string(),
                addr: info.to_string(),
            });
        }

        Ok(Arc::new(LocalHandle {
            addr: info,
            participant: binding.participant.clone(),
            reachable: binding.reachable.clone(),
        }))
    }
}

/// Handle to a participant in the same process
pub struct LocalHandle {
    addr: ParticipantInfo,
    participant: Arc<Participant>,
    reachable: Arc<AtomicBool>,
}

impl LocalHandle {
    fn check(&self) -> Result<&Participant, TransportError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(&self.participant)
        } else {
            Err(TransportError::ConnectionFailed(format!(
                "{} unreachable",
                self.addr
            )))
        }
    }
}

#[async_trait]
impl ParticipantRpc for LocalHandle {
    async fn prepare(&self, req: PhaseRequest) -> Result<bool, TransportError> {
        Ok(self.check()?.prepare(&req).await)
    }

    async fn commit(&self, req: PhaseRequest) -> Result<(), TransportError> {
        self.check()?.commit(&req).await;
        Ok(())
    }

    async fn abort(&self) -> Result<(), TransportError> {
        self.check()?.abort().await;
        Ok(())
    }

    async fn get(&self, key: &str, client: &str) -> Result<GetOutcome, TransportError> {
        Ok(self.check()?.get(key, client).await)
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        client: &str,
    ) -> Result<PutOutcome, TransportError> {
        Ok(self.check()?.put(key, value, client).await)
    }

    async fn delete(&self, key: &str, client: &str) -> Result<DeleteOutcome, TransportError> {
        Ok(self.check()?.delete(key, client).await)
    }
}
