//! Guided walkthrough on a scratch in-memory ledger.
//!
//! A loan passes through an agent recommendation, a human approval, and a
//! system disbursement. The demo verifies the chain, proves one entry,
//! exports the trail, then edits a copy of the export and shows the edit
//! being caught.

use serde_json::json;

use attestor_chain::{verify_exported_audit_trail, LedgerExport};
use attestor_contracts::{AttestorError, AttestorResult, NewEntry};
use attestor_core::IntegrityService;
use attestor_ledger::{LedgerConfig, StorageConfig};

pub fn run(config: &LedgerConfig) -> AttestorResult<bool> {
    let scratch = LedgerConfig {
        storage: StorageConfig::Memory,
        ..config.clone()
    };
    let service = IntegrityService::new(scratch.open_ledger()?);

    print_banner();

    // ── Step 1: record three decisions ──────────────────────────────────────
    println!("[1] Recording decisions on loan L-1001");
    let drafts = [
        NewEntry::agent("underwriter-bot", "recommend", "loan", "L-1001")
            .new_state(json!({ "status": "recommended", "score": 712 }))
            .rationale("score above auto-approve threshold"),
        NewEntry::human("j.ortiz", "approve", "loan", "L-1001")
            .previous_state(json!({ "status": "recommended" }))
            .new_state(json!({ "status": "approved" }))
            .rationale("documents verified"),
        NewEntry::system("payments", "disburse", "loan", "L-1001")
            .previous_state(json!({ "status": "approved" }))
            .new_state(json!({ "status": "disbursed", "amount": 25000 })),
    ];
    let mut ids = Vec::new();
    for draft in drafts {
        let record = service.record(draft)?;
        println!(
            "    seq {}  {:<16} {:<10} {}",
            record.sequence_number(),
            record.entry().actor,
            record.entry().action,
            short(record.entry_hash())
        );
        ids.push(record.id().to_string());
    }
    println!();

    // ── Step 2: verify the chain ────────────────────────────────────────────
    let result = service.verify_full_chain();
    println!(
        "[2] Chain verification: valid={} verified={}/{}",
        result.is_valid, result.verified_entries, result.total_entries
    );
    if let Some(root) = &result.merkle_root {
        println!("    merkle root {}", short(root));
    }
    println!();

    // ── Step 3: inclusion proof ─────────────────────────────────────────────
    let proof = service
        .generate_inclusion_proof(&ids[1])
        .ok_or_else(|| AttestorError::StorageFailed {
            reason: format!("no proof for freshly appended entry '{}'", ids[1]),
        })?;
    println!(
        "[3] Inclusion proof for the approval: {} steps, verifies={}",
        proof.proof_path.len(),
        service.verify_inclusion_proof(&proof)
    );
    println!();

    // ── Step 4: export and re-verify offline ────────────────────────────────
    let export = service.export_with_integrity_proofs(None, None)?;
    let offline = verify_exported_audit_trail(&export);
    println!(
        "[4] Exported {} entries ({}..={}), offline check valid={}",
        export.entries.len(),
        export.chain_start_sequence,
        export.chain_end_sequence,
        offline.is_valid
    );
    println!();

    // ── Step 5: edit the exported copy ──────────────────────────────────────
    let forged = forge_approval(&export)?;
    let caught = verify_exported_audit_trail(&forged);
    println!("[5] Rewrote the approval's rationale in a copy of the export");
    println!(
        "    offline check valid={} first_invalid_sequence={:?}",
        caught.is_valid, caught.first_invalid_sequence
    );
    if let Some(msg) = &caught.error_message {
        println!("    {}", msg);
    }
    println!();

    // ── Step 6: entity history ──────────────────────────────────────────────
    let history = service.entity_history("loan", "L-1001");
    println!("[6] History of loan L-1001: {} entries", history.len());
    for record in &history {
        println!(
            "    seq {}  {} by {} ({})",
            record.sequence_number(),
            record.entry().action,
            record.entry().actor,
            record.entry().actor_type
        );
    }
    println!();

    Ok(result.is_valid && offline.is_valid && !caught.is_valid)
}

/// The export with entry 1's rationale changed and nothing re-hashed.
fn forge_approval(export: &LedgerExport) -> AttestorResult<LedgerExport> {
    let mut raw = serde_json::to_value(export).map_err(|e| AttestorError::Serialization {
        reason: e.to_string(),
    })?;
    raw["entries"][1]["rationale"] = json!("approved without review");
    serde_json::from_value(raw).map_err(|e| AttestorError::Serialization {
        reason: e.to_string(),
    })
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

fn print_banner() {
    println!();
    println!("Attestor: tamper-evident audit ledger");
    println!("=====================================");
    println!();
    println!("Each appended entry is sealed with");
    println!("  SHA-256(canonical fields + previous entry's hash)");
    println!("so editing any entry breaks its own hash and every later link.");
    println!();
}
