//! Participant: one replica of the key-value store
//!
//! Protocol sub-state is the store's pending flag:
//!
//! ```text
//! IDLE --prepare--> PREPARED --commit--> IDLE
//!                   PREPARED --abort---> IDLE
//! IDLE --commit (stale)--> IDLE   (no-op, logged)
//! ```
//!
//! The state lock is only ever held inside a single verb, never across a call
//! to the coordinator. `put` on this replica makes the coordinator call back
//! into `prepare` on this same replica, so holding it there would deadlock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::common::{DeleteOutcome, GetOutcome, PhaseRequest, PutOutcome, TxnRequest};
use crate::participant::store::{Applied, ReplicaStore};
use crate::participant::vote::{AlwaysAgree, VoteValidator};
use crate::transport::{CoordinatorRpc, ParticipantRpc, TransportError};

pub struct Participant {
    port: u16,
    state: Mutex<ReplicaStore>,
    coordinator: Arc<dyn CoordinatorRpc>,
    validator: Arc<dyn VoteValidator>,
    /// Serializes client writes arriving at this replica
    write_gate: Mutex<()>,
}

impl Participant {
    pub fn new(port: u16, coordinator: Arc<dyn CoordinatorRpc>) -> Self {
        info!("Participant initialized on port {}", port);
        Self {
            port,
            state: Mutex::new(ReplicaStore::new()),
            coordinator,
            validator: Arc::new(AlwaysAgree),
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_validator(mut self, validator: impl VoteValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Vote on a transaction. With the default policy this always says yes.
    pub async fn prepare(&self, req: &PhaseRequest) -> bool {
        let txn = &req.txn;
        info!("Server {} - Preparing for operation: {}", req.port, txn);

        if !self
            .validator
            .validate(&txn.operation, &txn.key, txn.value.as_deref())
        {
            warn!("Server {} - Refusing to prepare {}", req.port, txn);
            return false;
        }

        let mut state = self.state.lock().await;
        if state.is_pending() {
            debug!(
                "Server {} - Earlier prepared transaction overwritten",
                req.port
            );
        }
        state.mark_prepared();
        true
    }

    /// Apply a transaction, but only if this replica has a pending yes vote.
    pub async fn commit(&self, req: &PhaseRequest) {
        let txn = &req.txn;
        let mut state = self.state.lock().await;
        if !state.is_pending() {
            warn!(
                "Server {} - Transaction was not prepared. Cannot commit.",
                req.port
            );
            return;
        }

        info!("Server {} - Committing operation: {}", req.port, txn);
        match state.apply(txn) {
            Applied::Stored => debug!("Server {} - Stored key {}", req.port, txn.key),
            Applied::Removed { existed } => {
                debug!(
                    "Server {} - Removed key {} (present: {})",
                    req.port, txn.key, existed
                )
            }
            Applied::MissingValue => {
                warn!("Server {} - PUT of key {} carried no value", req.port, txn.key)
            }
            Applied::Unrecognized(op) => warn!("Unknown operation: {}", op),
        }
        state.clear_pending();
    }

    pub async fn abort(&self) {
        info!("Aborting transaction...");
        self.state.lock().await.clear_pending();
    }

    /// Local read; never consults the pending flag or the coordinator.
    pub async fn get(&self, key: &str, client: &str) -> GetOutcome {
        let state = self.state.lock().await;
        match state.get(key) {
            Some(value) => {
                info!(
                    "Client Name - {} > Success GET : Key={}, Value={}",
                    client, key, value
                );
                GetOutcome::Found {
                    key: key.to_string(),
                    value: value.to_string(),
                }
            }
            None => {
                info!("Client Name - {} > Error GET : Key={} not found", client, key);
                GetOutcome::NotFound {
                    key: key.to_string(),
                }
            }
        }
    }

    pub async fn put(&self, key: &str, value: &str, client: &str) -> PutOutcome {
        let _gate = self.write_gate.lock().await;
        match self
            .coordinator
            .initiate_prepare_phase(TxnRequest::put(key, value))
            .await
        {
            Ok(true) => {
                info!(
                    "Client Name - {} > Success PUT : Key={}, Value={} stored.",
                    client, key, value
                );
                PutOutcome::Stored {
                    key: key.to_string(),
                    value: value.to_string(),
                }
            }
            Ok(false) => {
                info!("Client Name - {} > Error PUT : Transaction aborted", client);
                PutOutcome::Aborted
            }
            Err(e) => {
                warn!(
                    "Coordinator unreachable during the two-phase protocol (put): {}",
                    e
                );
                PutOutcome::Unavailable
            }
        }
    }

    pub async fn delete(&self, key: &str, client: &str) -> DeleteOutcome {
        let _gate = self.write_gate.lock().await;
        match self
            .coordinator
            .initiate_prepare_phase(TxnRequest::delete(key))
            .await
        {
            Ok(true) => {
                info!(
                    "Client Name - {} > Success DELETE : Key={} deleted.",
                    client, key
                );
                DeleteOutcome::Deleted {
                    key: key.to_string(),
                }
            }
            Ok(false) => {
                info!("Client Name - {} > Error DELETE: Key={} not found", client, key);
                DeleteOutcome::NotFound
            }
            Err(e) => {
                warn!(
                    "Coordinator unreachable during the two-phase protocol (delete): {}",
                    e
                );
                DeleteOutcome::Unavailable
            }
        }
    }

    pub async fn is_prepared(&self) -> bool {
        self.state.lock().await.is_pending()
    }

    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.state.lock().await.snapshot()
    }
}

#[async_trait]
impl ParticipantRpc for Participant {
    async fn prepare(&self, req: PhaseRequest) -> Result<bool, TransportError> {
        Ok(Participant::prepare(self, &req).await)
    }

    async fn commit(&self, req: PhaseRequest) -> Result<(), TransportError> {
        Participant::commit(self, &req).await;
        Ok(())
    }

    async fn abort(&self) -> Result<(), TransportError> {
        Participant::abort(self).await;
        Ok(())
    }

    async fn get(&self, key: &str, client: &str) -> Result<GetOutcome, TransportError> {
        Ok(Participant::get(self, key, client).await)
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        client: &str,
    ) -> Result<PutOutcome, TransportError> {
        Ok(Participant::put(self, key, value, client).await)
    }

    async fn delete(&self, key: &str, client: &str) -> Result<DeleteOutcome, TransportError> {
        Ok(Participant::delete(self, key, client).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Operation;
    use std::sync::Mutex as StdMutex;

    /// Coordinator stand-in that records requests and answers with a fixed result
    struct ScriptedCoordinator {
        answer: Result<bool, TransportError>,
        seen: StdMutex<Vec<TxnRequest>>,
    }

    impl ScriptedCoordinator {
        fn new(answer: Result<bool, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                seen: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CoordinatorRpc for ScriptedCoordinator {
        async fn initiate_prepare_phase(&self, txn: TxnRequest) -> Result<bool, TransportError> {
            self.seen.lock().unwrap().push(txn);
            self.answer.clone()
        }
    }

    fn phase(txn: TxnRequest) -> PhaseRequest {
        PhaseRequest { txn, port: 5001 }
    }

    #[tokio::test]
    async fn test_prepare_then_commit_applies() {
        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(true)));
        let req = phase(TxnRequest::put("a", "1"));

        assert!(participant.prepare(&req).await);
        assert!(participant.is_prepared().await);

        participant.commit(&req).await;
        assert!(!participant.is_prepared().await);
        assert_eq!(participant.get("a", "test").await.value(), Some("1"));
    }

    #[tokio::test]
    async fn test_commit_without_prepare_is_noop() {
        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(true)));
        participant.commit(&phase(TxnRequest::put("a", "1"))).await;

        assert!(participant.snapshot().await.is_empty());
        assert!(!participant.is_prepared().await);
    }

    #[tokio::test]
    async fn test_abort_clears_pending_without_applying() {
        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(true)));
        let req = phase(TxnRequest::put("a", "1"));

        participant.prepare(&req).await;
        participant.abort().await;
        assert!(!participant.is_prepared().await);

        // The vote is gone, so a late commit changes nothing
        participant.commit(&req).await;
        assert!(participant.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_operation_still_clears_pending() {
        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(true)));
        let req = phase(TxnRequest::new(Operation::from("GET"), "a", None));

        assert!(participant.prepare(&req).await);
        participant.commit(&req).await;
        assert!(!participant.is_prepared().await);
        assert!(participant.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_validator_refusal_leaves_flag_clear() {
        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(true)))
            .with_validator(|_: &Operation, key: &str, _: Option<&str>| key != "locked");

        assert!(!participant.prepare(&phase(TxnRequest::put("locked", "1"))).await);
        assert!(!participant.is_prepared().await);
        assert!(participant.prepare(&phase(TxnRequest::put("open", "1"))).await);
    }

    #[tokio::test]
    async fn test_put_outcomes() {
        let coordinator = ScriptedCoordinator::new(Ok(true));
        let participant = Participant::new(5001, coordinator.clone());
        assert_eq!(
            participant.put("a", "1", "alice").await,
            PutOutcome::Stored {
                key: "a".into(),
                value: "1".into()
            }
        );
        assert_eq!(
            coordinator.seen.lock().unwrap().as_slice(),
            &[TxnRequest::put("a", "1")]
        );

        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(false)));
        assert_eq!(participant.put("a", "1", "alice").await, PutOutcome::Aborted);

        let participant = Participant::new(
            5001,
            ScriptedCoordinator::new(Err(TransportError::ConnectionFailed("refused".into()))),
        );
        assert_eq!(participant.put("a", "1", "alice").await, PutOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_delete_outcomes() {
        let coordinator = ScriptedCoordinator::new(Ok(true));
        let participant = Participant::new(5001, coordinator.clone());
        assert_eq!(
            participant.delete("a", "bob").await,
            DeleteOutcome::Deleted { key: "a".into() }
        );
        assert_eq!(
            coordinator.seen.lock().unwrap().as_slice(),
            &[TxnRequest::delete("a")]
        );

        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(false)));
        assert_eq!(participant.delete("a", "bob").await, DeleteOutcome::NotFound);

        let participant =
            Participant::new(5001, ScriptedCoordinator::new(Err(TransportError::Timeout)));
        assert_eq!(participant.delete("a", "bob").await, DeleteOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_get_unknown_key() {
        let participant = Participant::new(5001, ScriptedCoordinator::new(Ok(true)));
        assert_eq!(
            participant.get("nope", "carol").await,
            GetOutcome::NotFound { key: "nope".into() }
        );
    }
}
