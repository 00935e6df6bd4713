//! # attestor-core
//!
//! The ledger store contract and the integrity service built on it.
//!
//! This crate provides:
//! - The two core traits (`LedgerStore`, `Journal`)
//! - The `IntegrityService` that answers "is the chain valid", "prove this
//!   entry is included", "export a verifiable bundle", and "which entries
//!   were tampered with"
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attestor_core::IntegrityService;
//! use attestor_ledger::Ledger;
//!
//! let service = IntegrityService::new(Arc::new(Ledger::in_memory()));
//! let id = service.create_entry(NewEntry::human("alice", "approve", "filing", "f-1"))?;
//! let proof = service.generate_inclusion_proof(&id).expect("just appended");
//! assert!(proof.verify());
//! ```

pub mod service;
pub mod traits;

pub use service::IntegrityService;
pub use traits::{Journal, LedgerStore};
