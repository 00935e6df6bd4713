//! The integrity service: the auditing façade over a ledger store.
//!
//! Collaborators submit entries through `create_entry` and consume
//! verification results, inclusion proofs, and export bundles. The service
//! owns no ledger state of its own; the store is injected at construction,
//! so tenants and tests each get an isolated ledger.
//!
//! Two scans with different failure semantics are exposed here:
//! `verify_full_chain` / `verify_range` stop at the first broken entry,
//! while `detect_tampering` examines every entry.

use std::sync::Arc;

use tracing::{debug, info, warn};

use attestor_chain::{
    check_entry, find_tampered, verify_exported_audit_trail, ImmutableEntry, LedgerExport, MerkleProof,
    GENESIS_HASH,
};
use attestor_contracts::{AttestorResult, ChainVerificationResult, EntryFault, NewEntry};

use crate::traits::LedgerStore;

/// Verification, proof, and export operations over one ledger.
#[derive(Clone)]
pub struct IntegrityService {
    store: Arc<dyn LedgerStore>,
}

impl IntegrityService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for direct lookups.
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Validate `draft` and append it, returning the assigned entry id.
    pub fn create_entry(&self, draft: NewEntry) -> AttestorResult<String> {
        self.record(draft).map(|record| record.id().to_string())
    }

    /// Validate `draft` and append it, returning the sealed record.
    pub fn record(&self, draft: NewEntry) -> AttestorResult<ImmutableEntry> {
        let entry = draft.into_entry()?;
        self.store.append(entry)
    }

    /// Verify the whole ledger, stopping at the first broken entry.
    pub fn verify_full_chain(&self) -> ChainVerificationResult {
        self.store.verify_chain(0, None)
    }

    /// Verify records `start..=end`, stopping at the first broken entry.
    pub fn verify_range(&self, start: u64, end: u64) -> ChainVerificationResult {
        self.store.verify_chain(start, Some(end))
    }

    /// Check one entry's sequence position, hash, and link to the record
    /// stored just before it.
    ///
    /// The position comes from the store, not from the record's own
    /// `sequence_number`, so an edited sequence number is reported as a
    /// `SequenceMismatch`.
    pub fn verify_entry(&self, entry_id: &str) -> Result<(), EntryFault> {
        let not_found = || EntryFault::NotFound { id: entry_id.to_string() };
        let position = self.store.position_of(entry_id).ok_or_else(not_found)?;
        let record = self.store.get_entry(position).ok_or_else(not_found)?;

        let predecessor = match position {
            0 => None,
            p => self.store.get_entry(p - 1).map(|prev| prev.entry_hash().to_string()),
        };

        let outcome = check_entry(&record, position, predecessor.as_deref());
        if let Err(fault) = &outcome {
            warn!(entry_id, position, fault = %fault, "entry failed verification");
        }
        outcome
    }

    /// Inclusion proof for `entry_id` against the current full-ledger root.
    pub fn generate_inclusion_proof(&self, entry_id: &str) -> Option<MerkleProof> {
        self.store.generate_merkle_proof(entry_id)
    }

    /// Check a proof on its own terms. Needs no ledger access.
    pub fn verify_inclusion_proof(&self, proof: &MerkleProof) -> bool {
        let ok = proof.verify();
        debug!(entry_id = %proof.entry_id, valid = ok, "inclusion proof checked");
        ok
    }

    /// Export records `start..=end` as a self-verifying bundle.
    pub fn export_with_integrity_proofs(
        &self,
        start: Option<u64>,
        end: Option<u64>,
    ) -> AttestorResult<LedgerExport> {
        let export = self.store.export_with_proofs(start, end)?;
        info!(
            start = export.chain_start_sequence,
            end = export.chain_end_sequence,
            tenant_id = export.tenant_id.as_deref().unwrap_or("-"),
            "ledger exported"
        );
        Ok(export)
    }

    /// Re-verify a previously exported bundle without consulting the store.
    pub fn verify_exported_audit_trail(&self, export: &LedgerExport) -> ChainVerificationResult {
        verify_exported_audit_trail(export)
    }

    /// Merkle root over the whole ledger.
    ///
    /// `GENESIS_HASH` when empty. Otherwise runs a full verification (O(n))
    /// and returns its root, or `None` if the chain is broken.
    pub fn get_merkle_root(&self) -> Option<String> {
        if self.store.entry_count() == 0 {
            return Some(GENESIS_HASH.to_string());
        }
        self.verify_full_chain().merkle_root
    }

    /// Sequence numbers of every record whose hash or linkage is broken.
    pub fn detect_tampering(&self) -> Vec<u64> {
        let count = self.store.entry_count();
        if count == 0 {
            return Vec::new();
        }

        let records = self.store.entries_in_range(0, count - 1);
        let tampered = find_tampered(&records, 0, None);
        if tampered.is_empty() {
            debug!(entries = count, "tamper scan clean");
        } else {
            warn!(entries = count, tampered = ?tampered, "tamper scan found broken entries");
        }
        tampered
    }

    /// Every record touching one entity, in sequence order.
    pub fn entity_history(&self, entity_type: &str, entity_id: &str) -> Vec<ImmutableEntry> {
        self.store.entity_history(entity_type, entity_id)
    }
}
