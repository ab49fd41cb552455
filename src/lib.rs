//! # replkv
//!
//! A small replicated key-value store kept consistent by two-phase commit:
//! - One coordinator drives every write through prepare, then commit or abort
//! - Every participant holds a full copy of the map and serves reads locally
//! - A write lands on all replicas or on none of them
//! - HTTP/JSON for both the internal RPC and the client API
//!
//! ## Architecture
//!
//! ```text
//!             put / delete
//! client ───────────────────▶ Participant k ──┐ initiate_prepare_phase
//!                                              ▼
//!                              ┌─────────────────────────────┐
//!                              │         Coordinator         │
//!                              │  prepare in replica order   │
//!                              │  then commit or abort all   │
//!                              └──────┬──────────┬───────────┘
//!                                     │          │
//!                         ┌───────────▼─┐  ┌─────▼───────┐
//!                         │ Participant 1│  │ Participant N│
//!                         │  map+pending │  │  map+pending │
//!                         └──────────────┘  └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start everything in one process
//! ```bash
//! replkv-cluster --base-port 5000 --participants 5
//! ```
//!
//! ### Start servers separately
//! ```bash
//! replkv-coord serve --bind 127.0.0.1:5000 \
//!   --participants 127.0.0.1:5001,127.0.0.1:5002
//!
//! replkv-participant serve --bind 127.0.0.1:5001 \
//!   --coordinator http://127.0.0.1:5000
//! ```
//!
//! ### Use the CLI
//! ```bash
//! replkv --participant http://127.0.0.1:5001 put my-key my-value
//! replkv --participant http://127.0.0.1:5002 get my-key
//! replkv --participant http://127.0.0.1:5003 delete my-key
//! ```

pub mod cluster;
pub mod common;
pub mod coordinator;
pub mod participant;
pub mod transport;

pub use cluster::LocalCluster;
pub use common::{Config, Error, Result};
pub use coordinator::Coordinator;
pub use participant::Participant;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
