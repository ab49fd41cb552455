//! Transaction and outcome types shared by the coordinator and participants

use serde::{Deserialize, Serialize};
use std::fmt;

/// Write operation carried by a transaction.
///
/// Parsed case-insensitively. Anything other than PUT or DELETE survives the
/// trip as `Unrecognized` so the replica can log it and skip it on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    Put,
    Delete,
    Unrecognized(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Put => "PUT",
            Operation::Delete => "DELETE",
            Operation::Unrecognized(op) => op,
        }
    }
}

impl From<&str> for Operation {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PUT" => Operation::Put,
            "DELETE" => Operation::Delete,
            _ => Operation::Unrecognized(s.to_string()),
        }
    }
}

impl From<String> for Operation {
    fn from(s: String) -> Self {
        Operation::from(s.as_str())
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single write in flight: one round of prepare then commit or abort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRequest {
    pub operation: Operation,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TxnRequest {
    pub fn new(operation: Operation, key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            operation,
            key: key.into(),
            value,
        }
    }

    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(Operation::Put, key, Some(value.into()))
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::new(Operation::Delete, key, None)
    }
}

impl fmt::Display for TxnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} key={} value={}", self.operation, self.key, value),
            None => write!(f, "{} key={}", self.operation, self.key),
        }
    }
}

/// Body of a prepare or commit call. `port` is the receiving replica's own
/// port and only appears in its log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRequest {
    #[serde(flatten)]
    pub txn: TxnRequest,
    pub port: u16,
}

/// Where a replica lives. Diagnostic only once the handle is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub host: String,
    pub port: u16,
}

impl ParticipantInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ParticipantInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GetOutcome {
    Found { key: String, value: String },
    NotFound { key: String },
}

impl GetOutcome {
    pub fn value(&self) -> Option<&str> {
        match self {
            GetOutcome::Found { value, .. } => Some(value),
            GetOutcome::NotFound { .. } => None,
        }
    }
}

impl fmt::Display for GetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GetOutcome::Found { key, value } => {
                write!(f, "Success: Key={}, Value={}", key, value)
            }
            GetOutcome::NotFound { .. } => f.write_str("Error: Key not found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PutOutcome {
    Stored { key: String, value: String },
    Aborted,
    /// The coordinator could not be reached; nothing was decided.
    Unavailable,
}

impl fmt::Display for PutOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutOutcome::Stored { key, value } => {
                write!(f, "Success: Key={}, Value={} stored.", key, value)
            }
            PutOutcome::Aborted => f.write_str("Error PUT: Transaction aborted"),
            PutOutcome::Unavailable => f.write_str(UNAVAILABLE_MESSAGE),
        }
    }
}

/// `NotFound` is reported for every failed round: the protocol cannot tell
/// an absent key from a refused vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted { key: String },
    NotFound,
    Unavailable,
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteOutcome::Deleted { key } => write!(f, "Success: Key={} deleted.", key),
            DeleteOutcome::NotFound => f.write_str("Error: Key not found"),
            DeleteOutcome::Unavailable => f.write_str(UNAVAILABLE_MESSAGE),
        }
    }
}

const UNAVAILABLE_MESSAGE: &str = "FAIL: coordinator unreachable. Please try again";
