//! JSON bodies exchanged over the HTTP transport

use serde::{Deserialize, Serialize};

pub const PREPARE_PATH: &str = "/rpc/prepare";
pub const COMMIT_PATH: &str = "/rpc/commit";
pub const ABORT_PATH: &str = "/rpc/abort";
pub const INFO_PATH: &str = "/rpc/info";
pub const KV_PATH: &str = "/kv";
pub const COORDINATOR_PREPARE_PATH: &str = "/coordinator/prepare";
pub const COORDINATOR_CONNECT_PATH: &str = "/coordinator/connect";
pub const HEALTH_PATH: &str = "/health";

/// Client name used when a caller does not identify itself
pub const ANONYMOUS_CLIENT: &str = "anonymous";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub vote: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub service: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareResponse {
    pub committed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub hosts: Vec<String>,
    pub ports: Vec<u16>,
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// Replicas added by this call
    pub connected: usize,
    /// Full membership after the call, in broadcast order
    pub replicas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub replicas: Vec<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutBody {
    pub value: String,
    #[serde(default = "anonymous")]
    pub client: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientQuery {
    #[serde(default = "anonymous")]
    pub client: String,
}

/// Key and client carried in the query string, for `GET|PUT|DELETE /kv?key=`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyQuery {
    pub key: String,
    #[serde(default = "anonymous")]
    pub client: String,
}

fn anonymous() -> String {
    ANONYMOUS_CLIENT.to_string()
}

/// Client-facing reply: the typed outcome plus its human-readable message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientReply<T> {
    pub outcome: T,
    pub message: String,
}

impl<T: std::fmt::Display> ClientReply<T> {
    pub fn new(outcome: T) -> Self {
        let message = outcome.to_string();
        Self { outcome, message }
    }
}
