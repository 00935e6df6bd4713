//! Verification result types.
//!
//! These are query results, never persisted. A failed verification is a
//! finding returned to the caller, not an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of scanning a range of the chain.
///
/// `is_valid == false` with `first_invalid_sequence == Some(k)` means the
/// entries before `k` in the scanned range were proven sound, entry `k`
/// failed, and everything after `k` was never examined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerificationResult {
    pub is_valid: bool,

    /// Number of entries in the requested range.
    pub total_entries: u64,

    /// Entries proven sound before the scan stopped.
    pub verified_entries: u64,

    pub first_invalid_sequence: Option<u64>,

    pub error_message: Option<String>,

    /// Merkle root over the scanned range; only present when `is_valid`.
    pub merkle_root: Option<String>,
}

impl ChainVerificationResult {
    /// A fully verified range of `total_entries` entries.
    pub fn valid(total_entries: u64, merkle_root: String) -> Self {
        Self {
            is_valid: true,
            total_entries,
            verified_entries: total_entries,
            first_invalid_sequence: None,
            error_message: None,
            merkle_root: Some(merkle_root),
        }
    }

    /// A scan that stopped at `fault` after proving `verified_entries`.
    pub fn broken(total_entries: u64, verified_entries: u64, fault: &EntryFault) -> Self {
        Self {
            is_valid: false,
            total_entries,
            verified_entries,
            first_invalid_sequence: fault.sequence(),
            error_message: Some(fault.to_string()),
            merkle_root: None,
        }
    }

    /// A structurally invalid bundle or range with no single failing entry.
    pub fn rejected(total_entries: u64, verified_entries: u64, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            total_entries,
            verified_entries,
            first_invalid_sequence: None,
            error_message: Some(reason.into()),
            merkle_root: None,
        }
    }
}

/// Why a single entry failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryFault {
    /// No entry with the requested id exists.
    #[error("entry '{id}' not found")]
    NotFound { id: String },

    /// The stored `entry_hash` does not match the recomputed hash.
    #[error("hash mismatch at sequence {sequence}: stored {stored}, computed {computed}")]
    HashMismatch {
        sequence: u64,
        stored: String,
        computed: String,
    },

    /// The stored `previous_hash` does not match the predecessor's `entry_hash`.
    #[error("chain linkage broken at sequence {sequence}: previous_hash {found}, predecessor hash {expected}")]
    LinkageMismatch {
        sequence: u64,
        expected: String,
        found: String,
    },

    /// The genesis entry does not point at the genesis sentinel.
    #[error("genesis entry has previous_hash {found}, expected the genesis sentinel")]
    GenesisMismatch { found: String },

    /// An entry sits at a position that does not match its sequence number.
    #[error("sequence gap: expected sequence {expected}, found {found}")]
    SequenceMismatch { expected: u64, found: u64 },
}

impl EntryFault {
    /// The sequence number the fault is attributed to, when there is one.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            EntryFault::NotFound { .. } => None,
            EntryFault::HashMismatch { sequence, .. } => Some(*sequence),
            EntryFault::LinkageMismatch { sequence, .. } => Some(*sequence),
            EntryFault::GenesisMismatch { .. } => Some(0),
            EntryFault::SequenceMismatch { expected, .. } => Some(*expected),
        }
    }
}
