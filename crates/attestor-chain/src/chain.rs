//! Hash-chain primitives: the genesis sentinel and entry hashing.
//!
//! Hash input layout (bytes, in order):
//!   1. canonical JSON of the hashed entry fields (see `canonical_preimage`)
//!   2. previous_hash as UTF-8 bytes (64 ASCII hex chars)
//!
//! The digest is returned as 64 lowercase hex characters.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use attestor_contracts::Entry;

use crate::canonical::{write_str, write_value};

/// The `previous_hash` of the entry at sequence 0 and the Merkle root of an
/// empty leaf set.
///
/// 64 ASCII zeros. SHA-256 output is never expected to be all zero bits, so
/// genesis detection is unambiguous.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Build the canonical JSON object hashed for an entry.
///
/// Keys, in this fixed (byte-sorted) order: `action`, `actor`, `actor_type`,
/// `entity_id`, `entity_type`, `new_state`, `previous_state`, `rationale`,
/// `sequence_number`, `tenant_id`, `timestamp`. Absent optionals are `null`.
/// The timestamp is RFC 3339 UTC with nine fractional digits and a `Z`
/// suffix. The entry `id` is not part of the preimage.
pub fn canonical_preimage(sequence_number: u64, entry: &Entry) -> String {
    let mut out = String::with_capacity(256);
    out.push('{');

    field(&mut out, "action", true);
    write_str(&mut out, &entry.action);

    field(&mut out, "actor", false);
    write_str(&mut out, &entry.actor);

    field(&mut out, "actor_type", false);
    write_str(&mut out, entry.actor_type.as_str());

    field(&mut out, "entity_id", false);
    write_str(&mut out, &entry.entity_id);

    field(&mut out, "entity_type", false);
    write_str(&mut out, &entry.entity_type);

    field(&mut out, "new_state", false);
    match &entry.new_state {
        Some(state) => write_value(&mut out, state),
        None => out.push_str("null"),
    }

    field(&mut out, "previous_state", false);
    match &entry.previous_state {
        Some(state) => write_value(&mut out, state),
        None => out.push_str("null"),
    }

    field(&mut out, "rationale", false);
    optional_str(&mut out, entry.rationale.as_deref());

    field(&mut out, "sequence_number", false);
    out.push_str(&sequence_number.to_string());

    field(&mut out, "tenant_id", false);
    optional_str(&mut out, entry.tenant_id.as_deref());

    field(&mut out, "timestamp", false);
    write_str(
        &mut out,
        &entry.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
    );

    out.push('}');
    out
}

/// Compute the chain hash for `entry` at `sequence_number`, linked to
/// `previous_hash`.
pub fn compute_hash(sequence_number: u64, entry: &Entry, previous_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_preimage(sequence_number, entry).as_bytes());
    hasher.update(previous_hash.as_bytes());
    hex::encode(hasher.finalize())
}

fn field(out: &mut String, name: &str, first: bool) {
    if !first {
        out.push(',');
    }
    write_str(out, name);
    out.push(':');
}

fn optional_str(out: &mut String, value: Option<&str>) {
    match value {
        Some(s) => write_str(out, s),
        None => out.push_str("null"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use attestor_contracts::{ActorType, Entry};

    use super::*;

    fn entry() -> Entry {
        Entry {
            id: "e-1".to_string(),
            tenant_id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            actor: "alice".to_string(),
            actor_type: ActorType::Human,
            action: "approve".to_string(),
            entity_type: "filing".to_string(),
            entity_id: "f-1".to_string(),
            previous_state: None,
            new_state: Some(json!({ "status": "approved", "amount": 10 })),
            rationale: Some("ok".to_string()),
        }
    }

    #[test]
    fn preimage_layout_is_pinned() {
        assert_eq!(
            canonical_preimage(7, &entry()),
            concat!(
                r#"{"action":"approve","actor":"alice","actor_type":"human","#,
                r#""entity_id":"f-1","entity_type":"filing","#,
                r#""new_state":{"amount":10,"status":"approved"},"previous_state":null,"#,
                r#""rationale":"ok","sequence_number":7,"tenant_id":null,"#,
                r#""timestamp":"2024-01-02T03:04:05.000000000Z"}"#
            )
        );
    }

    #[test]
    fn hash_is_sha256_of_preimage_then_previous_hash() {
        let e = entry();
        let expected = sha256_hex(format!("{}{}", canonical_preimage(0, &e), GENESIS_HASH).as_bytes());
        let actual = compute_hash(0, &e, GENESIS_HASH);

        assert_eq!(actual, expected);
        assert_eq!(actual.len(), 64);
        assert!(actual.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_commits_to_sequence_and_previous_hash() {
        let e = entry();
        let base = compute_hash(1, &e, GENESIS_HASH);
        assert_ne!(base, compute_hash(2, &e, GENESIS_HASH));
        assert_ne!(base, compute_hash(1, &e, &"1".repeat(64)));
    }

    #[test]
    fn id_is_not_hashed() {
        let a = entry();
        let mut b = entry();
        b.id = "another-id".to_string();
        assert_eq!(compute_hash(0, &a, GENESIS_HASH), compute_hash(0, &b, GENESIS_HASH));
    }

    #[test]
    fn known_digest_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
