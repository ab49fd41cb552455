//! RPC contracts between clients, participants and the coordinator

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::common::{DeleteOutcome, GetOutcome, PhaseRequest, PutOutcome, TxnRequest};

/// Any failure to complete a remote call. The protocol treats every variant
/// the same way: as a communication failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection to the target failed or broke mid-call
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Target address not known to the transport
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Something answered at the address, but not the requested service
    #[error("service {service} not bound at {addr}")]
    NotBound { service: String, addr: String },

    /// The target answered with an error status
    #[error("remote error: {0}")]
    Remote(String),
}

/// Calls a participant accepts. The first three come from the coordinator,
/// the rest from clients.
#[async_trait]
pub trait ParticipantRpc: Send + Sync {
    /// Vote on a transaction
    async fn prepare(&self, req: PhaseRequest) -> Result<bool, TransportError>;

    /// Apply a transaction that every replica voted for
    async fn commit(&self, req: PhaseRequest) -> Result<(), TransportError>;

    /// Forget the pending vote
    async fn abort(&self) -> Result<(), TransportError>;

    async fn get(&self, key: &str, client: &str) -> Result<GetOutcome, TransportError>;

    async fn put(&self, key: &str, value: &str, client: &str)
        -> Result<PutOutcome, TransportError>;

    async fn delete(&self, key: &str, client: &str) -> Result<DeleteOutcome, TransportError>;
}

/// Calls the coordinator accepts from participants
#[async_trait]
pub trait CoordinatorRpc: Send + Sync {
    /// Run one full two-phase round; `true` means committed everywhere it was sent
    async fn initiate_prepare_phase(&self, txn: TxnRequest) -> Result<bool, TransportError>;
}

/// Resolves a replica address to a callable handle
#[async_trait]
pub trait Registry: Send + Sync {
    async fn lookup(
        &self,
        host: &str,
        port: u16,
        service_name: &str,
    ) -> Result<Arc<dyn ParticipantRpc>, TransportError>;
}
