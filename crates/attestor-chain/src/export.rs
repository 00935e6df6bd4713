//! Archival export bundles and their offline verification.
//!
//! A `LedgerExport` is detached from the live store. Every exported record
//! travels with its hashes, along with the Merkle root over the exported
//! range, so the bundle can be re-verified on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use attestor_contracts::ChainVerificationResult;

use crate::{
    merkle::{build_proof, build_root, MerkleProof},
    record::ImmutableEntry,
    scan::{leaf_hashes, verify_records},
};

/// An independently re-verifiable slice of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerExport {
    /// Records `chain_start_sequence..=chain_end_sequence`, ascending.
    pub entries: Vec<ImmutableEntry>,

    /// Merkle root over exactly the exported entries.
    pub merkle_root: String,

    pub export_timestamp: DateTime<Utc>,

    pub chain_start_sequence: u64,

    pub chain_end_sequence: u64,

    pub tenant_id: Option<String>,
}

impl LedgerExport {
    /// Package `entries`, read from positions `chain_start_sequence..`, with
    /// the Merkle root over their stored hashes.
    ///
    /// The declared range comes from the read positions, not from the
    /// records' own (possibly edited) sequence numbers.
    pub fn new(entries: Vec<ImmutableEntry>, chain_start_sequence: u64, tenant_id: Option<String>) -> Self {
        let chain_end_sequence = chain_start_sequence + (entries.len() as u64).saturating_sub(1);
        let merkle_root = build_root(&leaf_hashes(&entries));

        info!(
            start = chain_start_sequence,
            end = chain_end_sequence,
            entries = entries.len(),
            merkle_root = %merkle_root,
            "ledger export packaged"
        );

        Self {
            entries,
            merkle_root,
            export_timestamp: Utc::now(),
            chain_start_sequence,
            chain_end_sequence,
            tenant_id,
        }
    }

    /// Inclusion proof for `entry_id` against this bundle's `merkle_root`.
    ///
    /// Needs no ledger access. Returns `None` if the id is not in the bundle.
    pub fn inclusion_proof(&self, entry_id: &str) -> Option<MerkleProof> {
        let index = self.entries.iter().position(|e| e.id() == entry_id)?;
        let path = build_proof(index, &leaf_hashes(&self.entries))?;

        Some(MerkleProof {
            entry_id: entry_id.to_string(),
            entry_hash: self.entries[index].entry_hash().to_string(),
            proof_path: path,
            merkle_root: self.merkle_root.clone(),
        })
    }
}

/// Re-verify an export with no access to the ledger it came from.
///
/// Checks, in order: the entry count matches the declared range; every
/// entry's hash, sequence position, and linkage (genesis anchoring when the
/// range starts at 0); and finally that the recomputed Merkle root equals
/// the declared one. Returns a result describing the first problem found.
pub fn verify_exported_audit_trail(export: &LedgerExport) -> ChainVerificationResult {
    let total = export.entries.len() as u64;

    let declared = export
        .chain_end_sequence
        .checked_sub(export.chain_start_sequence)
        .and_then(|span| span.checked_add(1));
    if declared != Some(total) {
        warn!(
            start = export.chain_start_sequence,
            end = export.chain_end_sequence,
            entries = total,
            "export range does not match its entry count"
        );
        return ChainVerificationResult::rejected(
            total,
            0,
            format!(
                "export declares sequences {}..={} but carries {} entries",
                export.chain_start_sequence, export.chain_end_sequence, total
            ),
        );
    }

    let result = verify_records(&export.entries, export.chain_start_sequence, None);
    if !result.is_valid {
        return result;
    }

    match result.merkle_root.as_deref() {
        Some(root) if root == export.merkle_root => result,
        Some(root) => {
            warn!(
                declared = %export.merkle_root,
                computed = %root,
                "export merkle root mismatch"
            );
            ChainVerificationResult::rejected(
                total,
                total,
                format!(
                    "merkle root mismatch: export declares {}, entries produce {}",
                    export.merkle_root, root
                ),
            )
        }
        None => ChainVerificationResult::rejected(total, total, "merkle root could not be computed"),
    }
}
