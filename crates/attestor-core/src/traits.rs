//! Core trait definitions for the Attestor ledger.
//!
//! - `LedgerStore`: the append-only, sequentially numbered record store.
//!   Implementors provide append and lookups; range verification, proof
//!   generation, and export are provided on top of them.
//! - `Journal`: the durability seam a store persists through.
//!
//! The `IntegrityService` is written against `dyn LedgerStore`, so any store
//! satisfying this contract can be audited the same way.

use tracing::debug;

use attestor_chain::{
    build_proof, build_root, leaf_hashes, verify_records, ImmutableEntry, LedgerExport, MerkleProof,
    GENESIS_HASH,
};
use attestor_contracts::{AttestorError, AttestorResult, ChainVerificationResult, Entry};

/// An append-only ledger of hash-chained records.
///
/// Implementations must serialize `append` end to end (read tip, hash,
/// persist, publish) and must never expose a record to readers before it is
/// durably committed. Reads may run concurrently.
pub trait LedgerStore: Send + Sync {
    /// Seal `entry` at the next sequence number and commit it.
    ///
    /// A failed commit must not consume a sequence number.
    fn append(&self, entry: Entry) -> AttestorResult<ImmutableEntry>;

    /// The record at `sequence_number`, if committed.
    fn get_entry(&self, sequence_number: u64) -> Option<ImmutableEntry>;

    /// The record with entry id `id`, if committed.
    fn get_entry_by_id(&self, id: &str) -> Option<ImmutableEntry>;

    /// Number of committed records.
    fn entry_count(&self) -> u64;

    /// Committed records at positions `start..=end`, ascending.
    ///
    /// `end` is clamped to the last record; an empty `Vec` is returned when
    /// the range holds nothing.
    fn entries_in_range(&self, start: u64, end: u64) -> Vec<ImmutableEntry>;

    /// Position of the record with entry id `id`.
    ///
    /// This is where the record sits in the store, which is what its
    /// `sequence_number` must equal. It never reads the stored field.
    fn position_of(&self, id: &str) -> Option<u64> {
        let count = self.entry_count();
        if count == 0 {
            return None;
        }
        self.entries_in_range(0, count - 1)
            .iter()
            .position(|r| r.id() == id)
            .map(|i| i as u64)
    }

    /// The tenant this ledger is scoped to, if any.
    fn tenant_id(&self) -> Option<&str> {
        None
    }

    /// Verify records `start..=end` (default: through the last record),
    /// stopping at the first broken entry.
    ///
    /// The first record is checked against the stored hash of its
    /// predecessor, or against `GENESIS_HASH` at sequence 0. On success the
    /// result carries the Merkle root over the range.
    fn verify_chain(&self, start: u64, end: Option<u64>) -> ChainVerificationResult {
        let count = self.entry_count();
        if count == 0 {
            return ChainVerificationResult::valid(0, GENESIS_HASH.to_string());
        }

        let end = end.unwrap_or(count - 1).min(count - 1);
        if start > end {
            return ChainVerificationResult::rejected(
                0,
                0,
                format!("range {}..={} holds no entries (ledger has {})", start, end, count),
            );
        }

        let records = self.entries_in_range(start, end);
        let anchor = match start {
            0 => None,
            s => self.get_entry(s - 1).map(|prev| prev.entry_hash().to_string()),
        };

        debug!(start, end, records = records.len(), "verifying chain range");
        verify_records(&records, start, anchor.as_deref())
    }

    /// Inclusion proof for `entry_id` against the root over the whole ledger
    /// as it stands now.
    ///
    /// Returns `None` if the id is unknown. Later appends change the root,
    /// so the proof stays valid only against the root it carries.
    fn generate_merkle_proof(&self, entry_id: &str) -> Option<MerkleProof> {
        let count = self.entry_count();
        if count == 0 {
            return None;
        }

        let records = self.entries_in_range(0, count - 1);
        let index = records.iter().position(|r| r.id() == entry_id)?;
        let leaves = leaf_hashes(&records);
        let proof_path = build_proof(index, &leaves)?;

        debug!(entry_id, index, depth = proof_path.len(), "merkle proof generated");
        Some(MerkleProof {
            entry_id: entry_id.to_string(),
            entry_hash: leaves[index].clone(),
            proof_path,
            merkle_root: build_root(&leaves),
        })
    }

    /// Package records `start..=end` with the Merkle root over that range.
    ///
    /// Corrupted records are exported as stored; the bundle's own
    /// verification reports them. An empty range is an error.
    fn export_with_proofs(&self, start: Option<u64>, end: Option<u64>) -> AttestorResult<LedgerExport> {
        let count = self.entry_count();
        let start = start.unwrap_or(0);
        let end = end.unwrap_or(count.saturating_sub(1));

        if count == 0 || start > end || start >= count {
            return Err(AttestorError::InvalidRange { start, end, count });
        }

        let end = end.min(count - 1);
        let records = self.entries_in_range(start, end);
        Ok(LedgerExport::new(records, start, self.tenant_id().map(str::to_string)))
    }

    /// Every record touching one entity, in sequence order.
    fn entity_history(&self, entity_type: &str, entity_id: &str) -> Vec<ImmutableEntry> {
        let count = self.entry_count();
        if count == 0 {
            return Vec::new();
        }
        self.entries_in_range(0, count - 1)
            .into_iter()
            .filter(|r| r.entry().entity_type == entity_type && r.entry().entity_id == entity_id)
            .collect()
    }
}

/// Durable storage a ledger commits through.
///
/// `persist` must be all-or-nothing: on `Err`, nothing of the record may
/// remain in the journal.
pub trait Journal: Send {
    /// Read back every committed record in append order.
    ///
    /// Records are returned as stored, without hash verification.
    fn load(&mut self) -> AttestorResult<Vec<ImmutableEntry>>;

    /// Durably write one record after the current tail.
    fn persist(&mut self, record: &ImmutableEntry) -> AttestorResult<()>;
}
