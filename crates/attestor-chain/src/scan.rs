//! Chain scans over a contiguous slice of records.
//!
//! Two scans with deliberately different failure semantics:
//!
//! - `verify_records` stops at the first broken entry and reports the valid
//!   prefix. Entries after the break are left unexamined.
//! - `find_tampered` examines every entry and returns each sequence number
//!   whose hash or linkage is broken.
//!
//! Neither scan panics or errors; corruption is reported as data.

use tracing::{debug, warn};

use attestor_contracts::{ChainVerificationResult, EntryFault};

use crate::{chain::GENESIS_HASH, merkle::build_root, record::ImmutableEntry};

/// Check one record in isolation against its expected position and
/// predecessor hash.
///
/// `expected_previous` is `None` when the predecessor is unknown (the first
/// record of an archived range that does not start at 0); linkage is then
/// not checked. At sequence 0 the record must always point at
/// `GENESIS_HASH`.
///
/// Checks run in order: sequence position, content hash, linkage.
pub fn check_entry(
    record: &ImmutableEntry,
    expected_sequence: u64,
    expected_previous: Option<&str>,
) -> Result<(), EntryFault> {
    if record.sequence_number() != expected_sequence {
        return Err(EntryFault::SequenceMismatch {
            expected: expected_sequence,
            found: record.sequence_number(),
        });
    }

    let computed = record.computed_hash();
    if computed != record.entry_hash() {
        return Err(EntryFault::HashMismatch {
            sequence: expected_sequence,
            stored: record.entry_hash().to_string(),
            computed,
        });
    }

    if expected_sequence == 0 {
        if record.previous_hash() != GENESIS_HASH {
            return Err(EntryFault::GenesisMismatch {
                found: record.previous_hash().to_string(),
            });
        }
    } else if let Some(expected) = expected_previous {
        if record.previous_hash() != expected {
            return Err(EntryFault::LinkageMismatch {
                sequence: expected_sequence,
                expected: expected.to_string(),
                found: record.previous_hash().to_string(),
            });
        }
    }

    Ok(())
}

/// Verify `records`, which must hold sequences `start_sequence..` in order,
/// stopping at the first failure.
///
/// `anchor` is the stored `entry_hash` of the record just before the range,
/// if known. On success the result carries the Merkle root over the range.
pub fn verify_records(
    records: &[ImmutableEntry],
    start_sequence: u64,
    anchor: Option<&str>,
) -> ChainVerificationResult {
    let total = records.len() as u64;
    let mut expected_previous = anchor;

    for (offset, record) in records.iter().enumerate() {
        let sequence = start_sequence + offset as u64;
        if let Err(fault) = check_entry(record, sequence, expected_previous) {
            warn!(
                sequence,
                verified = offset,
                fault = %fault,
                "chain verification stopped at broken entry"
            );
            return ChainVerificationResult::broken(total, offset as u64, &fault);
        }
        expected_previous = Some(record.entry_hash());
    }

    let root = build_root(&leaf_hashes(records));
    debug!(start_sequence, total, merkle_root = %root, "chain range verified");
    ChainVerificationResult::valid(total, root)
}

/// Exhaustively scan `records` and return every broken sequence number.
///
/// Linkage is checked against the predecessor's stored `entry_hash`, so a
/// single edited entry is reported alone rather than dragging its successor
/// with it.
pub fn find_tampered(records: &[ImmutableEntry], start_sequence: u64, anchor: Option<&str>) -> Vec<u64> {
    let mut tampered = Vec::new();
    let mut expected_previous = anchor;

    for (offset, record) in records.iter().enumerate() {
        let sequence = start_sequence + offset as u64;
        if let Err(fault) = check_entry(record, sequence, expected_previous) {
            warn!(sequence, fault = %fault, "tampered entry detected");
            tampered.push(sequence);
        }
        expected_previous = Some(record.entry_hash());
    }

    tampered
}

/// The Merkle leaves of a range: stored entry hashes in sequence order.
pub fn leaf_hashes(records: &[ImmutableEntry]) -> Vec<String> {
    records.iter().map(|r| r.entry_hash().to_string()).collect()
}
