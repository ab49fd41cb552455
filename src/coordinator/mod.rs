//! Coordinator: owns the replica set and runs two-phase commit for every write
//!
//! The coordinator is responsible for:
//! - Membership (resolving participant addresses once, at connect time)
//! - Vote collection (sequential prepares in membership order)
//! - Commit or abort broadcast to the whole replica set

pub mod http;
pub mod protocol;
pub mod server;

pub use protocol::Coordinator;
pub use server::{serve_coordinator, CoordinatorServer};
