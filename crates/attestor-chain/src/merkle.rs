//! Merkle tree over entry hashes, with inclusion proofs.
//!
//! Internal nodes are `SHA256(left_hex || right_hex)` over the ASCII hex
//! strings of their children. A level with an odd number of nodes pairs its
//! last node with itself. Proof construction applies the same rule, so a
//! duplicated node yields a proof step whose sibling is the node itself.
//!
//! Verification needs nothing but the proof: an auditor can check a
//! `MerkleProof` with no access to the ledger.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{sha256_hex, GENESIS_HASH};

/// Which side of the current node a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// One step of an inclusion proof.
///
/// Serialized as a two-element array: `["<sibling hex>", "left"|"right"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Position)", into = "(String, Position)")]
pub struct ProofStep {
    pub sibling: String,
    pub position: Position,
}

impl ProofStep {
    pub fn new(sibling: impl Into<String>, position: Position) -> Self {
        Self {
            sibling: sibling.into(),
            position,
        }
    }
}

impl From<(String, Position)> for ProofStep {
    fn from((sibling, position): (String, Position)) -> Self {
        Self { sibling, position }
    }
}

impl From<ProofStep> for (String, Position) {
    fn from(step: ProofStep) -> Self {
        (step.sibling, step.position)
    }
}

/// A portable proof that one entry is included under a Merkle root.
///
/// Valid only against the root it was generated for; appending to the ledger
/// produces a new root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub entry_id: String,
    pub entry_hash: String,
    /// Sibling hashes ordered leaf to root.
    pub proof_path: Vec<ProofStep>,
    pub merkle_root: String,
}

impl MerkleProof {
    /// Recompute the root from `entry_hash` and `proof_path` and compare.
    pub fn verify(&self) -> bool {
        verify_merkle_proof(&self.entry_hash, &self.proof_path, &self.merkle_root)
    }
}

/// Hash two sibling nodes into their parent.
pub fn hash_pair(left: &str, right: &str) -> String {
    let mut combined = String::with_capacity(left.len() + right.len());
    combined.push_str(left);
    combined.push_str(right);
    sha256_hex(combined.as_bytes())
}

/// Compute the Merkle root of `leaf_hashes`, in the given order.
///
/// Empty input yields `GENESIS_HASH`; a single leaf is its own root.
pub fn build_root(leaf_hashes: &[String]) -> String {
    match leaf_hashes {
        [] => GENESIS_HASH.to_string(),
        [only] => only.clone(),
        _ => {
            let mut level = next_level(leaf_hashes);
            while level.len() > 1 {
                level = next_level(&level);
            }
            debug!(leaves = leaf_hashes.len(), root = %level[0], "merkle root built");
            level.swap_remove(0)
        }
    }
}

/// Build the sibling path from leaf `leaf_index` up to the root.
///
/// Returns `None` if `leaf_index` is out of range. A single-leaf tree has an
/// empty path.
pub fn build_proof(leaf_index: usize, leaf_hashes: &[String]) -> Option<Vec<ProofStep>> {
    if leaf_index >= leaf_hashes.len() {
        return None;
    }

    let mut path = Vec::new();
    let mut index = leaf_index;
    let mut level = leaf_hashes.to_vec();

    while level.len() > 1 {
        let step = if index % 2 == 0 {
            // Last node of an odd level is paired with itself.
            let sibling = level.get(index + 1).unwrap_or(&level[index]);
            ProofStep::new(sibling.clone(), Position::Right)
        } else {
            ProofStep::new(level[index - 1].clone(), Position::Left)
        };
        path.push(step);

        level = next_level(&level);
        index /= 2;
    }

    Some(path)
}

/// Check that `entry_hash` folds up `proof_path` to `expected_root`.
pub fn verify_merkle_proof(entry_hash: &str, proof_path: &[ProofStep], expected_root: &str) -> bool {
    let mut current = entry_hash.to_string();
    for step in proof_path {
        current = match step.position {
            Position::Left => hash_pair(&step.sibling, &current),
            Position::Right => hash_pair(&current, &step.sibling),
        };
    }
    current == expected_root
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [last] => hash_pair(last, last),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn leaves(n: usize) -> Vec<String> {
        (0..n).map(|i| sha256_hex(format!("leaf-{i}").as_bytes())).collect()
    }

    // ── Roots ─────────────────────────────────────────────────────────────────

    #[test]
    fn empty_root_is_genesis() {
        assert_eq!(build_root(&[]), GENESIS_HASH);
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let l = leaves(1);
        assert_eq!(build_root(&l), l[0]);
    }

    #[test]
    fn two_leaves_hash_once() {
        let l = leaves(2);
        assert_eq!(build_root(&l), hash_pair(&l[0], &l[1]));
    }

    #[test]
    fn three_leaves_duplicate_the_last() {
        let l = leaves(3);
        let expected = hash_pair(&hash_pair(&l[0], &l[1]), &hash_pair(&l[2], &l[2]));
        assert_eq!(build_root(&l), expected);
    }

    #[test]
    fn five_leaves_duplicate_on_every_odd_level() {
        let l = leaves(5);
        let a = hash_pair(&l[0], &l[1]);
        let b = hash_pair(&l[2], &l[3]);
        let c = hash_pair(&l[4], &l[4]);
        let ab = hash_pair(&a, &b);
        let cc = hash_pair(&c, &c);
        assert_eq!(build_root(&l), hash_pair(&ab, &cc));
    }

    #[test]
    fn root_is_deterministic() {
        let l = leaves(7);
        assert_eq!(build_root(&l), build_root(&l.clone()));
    }

    #[test]
    fn root_is_order_sensitive() {
        let l = leaves(4);
        let mut swapped = l.clone();
        swapped.swap(1, 2);
        assert_ne!(build_root(&l), build_root(&swapped));
    }

    #[test]
    fn mutating_any_leaf_changes_root() {
        let l = leaves(6);
        let root = build_root(&l);
        for i in 0..l.len() {
            let mut mutated = l.clone();
            mutated[i] = sha256_hex(b"tampered");
            assert_ne!(build_root(&mutated), root, "leaf {i} did not affect root");
        }
    }

    // ── Proofs ────────────────────────────────────────────────────────────────

    #[test]
    fn every_leaf_proves_for_sizes_up_to_seventeen() {
        for n in 1..=17 {
            let l = leaves(n);
            let root = build_root(&l);
            for (i, leaf) in l.iter().enumerate() {
                let path = build_proof(i, &l).unwrap();
                assert!(
                    verify_merkle_proof(leaf, &path, &root),
                    "proof for leaf {i} of {n} failed"
                );
            }
        }
    }

    #[test]
    fn single_leaf_proof_is_empty() {
        let l = leaves(1);
        assert_eq!(build_proof(0, &l).unwrap(), Vec::<ProofStep>::new());
    }

    #[test]
    fn out_of_range_index_has_no_proof() {
        assert!(build_proof(3, &leaves(3)).is_none());
        assert!(build_proof(0, &[]).is_none());
    }

    #[test]
    fn duplicated_node_appears_as_its_own_sibling() {
        let l = leaves(3);
        let path = build_proof(2, &l).unwrap();
        assert_eq!(path[0], ProofStep::new(l[2].clone(), Position::Right));
        assert_eq!(path[1].position, Position::Left);
        assert_eq!(path[1].sibling, hash_pair(&l[0], &l[1]));
    }

    #[test]
    fn proof_fails_against_other_root_or_leaf() {
        let l = leaves(4);
        let root = build_root(&l);
        let path = build_proof(1, &l).unwrap();

        assert!(!verify_merkle_proof(&l[2], &path, &root));
        assert!(!verify_merkle_proof(&l[1], &path, &build_root(&leaves(5))));
    }

    #[test]
    fn flipped_position_breaks_proof() {
        let l = leaves(4);
        let root = build_root(&l);
        let mut path = build_proof(0, &l).unwrap();
        path[0].position = Position::Left;
        assert!(!verify_merkle_proof(&l[0], &path, &root));
    }

    #[test]
    fn proof_serializes_as_pairs() {
        let proof = MerkleProof {
            entry_id: "e-1".to_string(),
            entry_hash: "aa".to_string(),
            proof_path: vec![ProofStep::new("bb", Position::Left)],
            merkle_root: "cc".to_string(),
        };
        let value = serde_json::to_value(&proof).unwrap();
        assert_eq!(value["proof_path"], serde_json::json!([["bb", "left"]]));

        let back: MerkleProof = serde_json::from_value(value).unwrap();
        assert_eq!(back, proof);
    }
}
