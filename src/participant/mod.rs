//! Participant: a replica of the key-value store
//!
//! Handles:
//! - Votes, commits and aborts from the coordinator
//! - Local reads
//! - Client writes, which it hands to the coordinator as a two-phase round

pub mod http;
pub mod replica;
pub mod server;
pub mod store;
pub mod vote;

pub use replica::Participant;
pub use server::{serve_participant, ParticipantServer};
pub use vote::{AlwaysAgree, VoteValidator};
