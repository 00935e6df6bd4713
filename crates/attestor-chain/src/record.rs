//! The hash-stamped ledger record.
//!
//! `ImmutableEntry` wraps an `Entry` with its position in the chain and the
//! two hashes that make tampering detectable. Its fields are private and the
//! only in-process constructor is `from_entry`, which computes the hash and
//! chain fields together. Records read back from storage or an archive are
//! deserialized as-is and must be checked with `verify_hash`.

use serde::{Deserialize, Serialize};

use attestor_contracts::Entry;

use crate::chain::compute_hash;

/// One sealed record in the hash chain.
///
/// On the wire the entry fields are flattened alongside `sequence_number`,
/// `previous_hash`, and `entry_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmutableEntry {
    #[serde(flatten)]
    pub(crate) entry: Entry,

    /// Position in the chain, gapless from 0.
    pub(crate) sequence_number: u64,

    /// `entry_hash` of the predecessor, or `GENESIS_HASH` at sequence 0.
    pub(crate) previous_hash: String,

    /// SHA-256 (hex) of the canonical entry fields followed by `previous_hash`.
    pub(crate) entry_hash: String,
}

impl ImmutableEntry {
    /// Seal `entry` at `sequence_number`, linked to `previous_hash`.
    pub fn from_entry(entry: Entry, sequence_number: u64, previous_hash: impl Into<String>) -> Self {
        let previous_hash = previous_hash.into();
        let entry_hash = compute_hash(sequence_number, &entry, &previous_hash);
        Self {
            entry,
            sequence_number,
            previous_hash,
            entry_hash,
        }
    }

    /// Recompute the hash from the stored fields.
    pub fn computed_hash(&self) -> String {
        compute_hash(self.sequence_number, &self.entry, &self.previous_hash)
    }

    /// True when the stored `entry_hash` matches the recomputed one.
    pub fn verify_hash(&self) -> bool {
        self.computed_hash() == self.entry_hash
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn entry_hash(&self) -> &str {
        &self.entry_hash
    }

    pub fn into_entry(self) -> Entry {
        self.entry
    }
}
