//! # attestor-contracts
//!
//! Shared types and errors for the Attestor audit ledger.
//!
//! All crates in the workspace import from here. No hashing or storage logic
//! lives in this crate, only entry definitions, verification reports, and
//! error types.

pub mod entry;
pub mod error;
pub mod report;

pub use entry::{ActorType, Entry, NewEntry};
pub use error::{AttestorError, AttestorResult};
pub use report::{ChainVerificationResult, EntryFault};
