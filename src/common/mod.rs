//! Common utilities and types shared across replkv

pub mod config;
pub mod error;
pub mod logging;
pub mod tracing_middleware;
pub mod txn;
pub mod utils;

pub use config::{ClusterConfig, Config, CoordinatorConfig, NodeRole, ParticipantConfig};
pub use error::{Error, Result};
pub use txn::{
    DeleteOutcome, GetOutcome, Operation, ParticipantInfo, PhaseRequest, PutOutcome, TxnRequest,
};
pub use utils::{parse_duration, parse_duration_ms, split_addrs, split_host_port};
