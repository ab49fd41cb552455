//! Transport layer for two-phase commit RPC
//!
//! - `HttpParticipantClient` / `HttpCoordinatorClient` / `HttpRegistry`: HTTP/JSON
//! - `LocalRegistry`: in-process handles with fault injection, for tests

pub mod http;
pub mod local;
pub mod traits;
pub mod wire;

pub use http::{HttpCoordinatorClient, HttpParticipantClient, HttpRegistry};
pub use local::LocalRegistry;
pub use traits::{CoordinatorRpc, ParticipantRpc, Registry, TransportError};
