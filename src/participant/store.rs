//! Replica state: the key-value map plus the pending-vote flag

use std::collections::HashMap;

use crate::common::{Operation, TxnRequest};

/// What a committed transaction did to the map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Stored,
    Removed { existed: bool },
    /// PUT arrived without a value; nothing written
    MissingValue,
    Unrecognized(String),
}

/// In-memory replica. Only `apply` mutates the map.
#[derive(Debug, Default)]
pub struct ReplicaStore {
    data: HashMap<String, String>,
    pending: bool,
}

impl ReplicaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Record a yes vote. A second vote simply overwrites the first.
    pub fn mark_prepared(&mut self) {
        self.pending = true;
    }

    pub fn clear_pending(&mut self) {
        self.pending = false;
    }

    /// Apply a committed transaction. Does not touch the pending flag.
    pub fn apply(&mut self, txn: &TxnRequest) -> Applied {
        match (&txn.operation, &txn.value) {
            (Operation::Put, Some(value)) => {
                self.data.insert(txn.key.clone(), value.clone());
                Applied::Stored
            }
            (Operation::Put, None) => Applied::MissingValue,
            (Operation::Delete, _) => Applied::Removed {
                existed: self.data.remove(&txn.key).is_some(),
            },
            (Operation::Unrecognized(op), _) => Applied::Unrecognized(op.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_overwrites() {
        let mut store = ReplicaStore::new();
        assert_eq!(store.apply(&TxnRequest::put("a", "1")), Applied::Stored);
        assert_eq!(store.apply(&TxnRequest::put("a", "2")), Applied::Stored);
        assert_eq!(store.get("a"), Some("2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_absent_key_is_not_an_error() {
        let mut store = ReplicaStore::new();
        assert_eq!(
            store.apply(&TxnRequest::delete("ghost")),
            Applied::Removed { existed: false }
        );

        store.apply(&TxnRequest::put("a", "1"));
        assert_eq!(
            store.apply(&TxnRequest::delete("a")),
            Applied::Removed { existed: true }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_unrecognized_and_valueless_put_leave_map_alone() {
        let mut store = ReplicaStore::new();
        let merge = TxnRequest::new(Operation::from("MERGE"), "a", Some("1".into()));
        assert_eq!(store.apply(&merge), Applied::Unrecognized("MERGE".into()));

        let bare_put = TxnRequest::new(Operation::Put, "a", None);
        assert_eq!(store.apply(&bare_put), Applied::MissingValue);
        assert!(store.is_empty());
    }

    #[test]
    fn test_pending_flag() {
        let mut store = ReplicaStore::new();
        assert!(!store.is_pending());
        store.mark_prepared();
        store.mark_prepared();
        assert!(store.is_pending());
        store.clear_pending();
        assert!(!store.is_pending());
    }
}
