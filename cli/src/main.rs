//! Attestor command-line front end.
//!
//! Appends to, verifies, proves against, and exports a ledger selected by a
//! TOML config file or a `--ledger` JSON Lines path.
//!
//! Usage:
//!   attestor demo
//!   attestor --ledger audit.jsonl append --actor alice --actor-type human \
//!       --action approve --entity-type loan --entity-id L-1
//!   attestor --ledger audit.jsonl verify
//!   attestor --ledger audit.jsonl prove <ENTRY_ID> > proof.json
//!   attestor check-proof proof.json

mod demo;

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand, ValueEnum};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use attestor_chain::{verify_exported_audit_trail, LedgerExport, MerkleProof};
use attestor_contracts::{ActorType, AttestorError, AttestorResult, ChainVerificationResult, NewEntry};
use attestor_core::IntegrityService;
use attestor_ledger::{LedgerConfig, StorageConfig};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Attestor: tamper-evident audit ledger.
#[derive(Parser)]
#[command(
    name = "attestor",
    about = "Tamper-evident, hash-chained audit ledger",
    long_about = "Records who did what to which entity in an append-only SHA-256 chain,\n\
                  and verifies, proves, and exports it."
)]
struct Cli {
    /// Ledger config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON Lines ledger file. Overrides the configured storage.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk through append, verification, proofs, and tamper detection on a
    /// scratch in-memory ledger.
    Demo,

    /// Append one entry and print the sealed record.
    Append(AppendArgs),

    /// Verify the chain, or the inclusive range START..=END.
    Verify {
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long)]
        end: Option<u64>,
    },

    /// List the sequence numbers of every entry that fails verification.
    Scan,

    /// Print an inclusion proof for an entry.
    Prove { entry_id: String },

    /// Export a range with its Merkle root.
    Export {
        #[arg(long)]
        start: Option<u64>,
        #[arg(long)]
        end: Option<u64>,
        /// Write the bundle here instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Re-verify an exported bundle without the ledger.
    CheckExport { path: PathBuf },

    /// Check an inclusion proof, optionally against a known root.
    CheckProof {
        path: PathBuf,
        #[arg(long)]
        root: Option<String>,
    },
}

#[derive(clap::Args)]
struct AppendArgs {
    #[arg(long)]
    actor: String,
    #[arg(long, value_enum)]
    actor_type: ActorKind,
    #[arg(long)]
    action: String,
    #[arg(long)]
    entity_type: String,
    #[arg(long)]
    entity_id: String,
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    tenant: Option<String>,
    #[arg(long)]
    rationale: Option<String>,
    /// Prior state as a JSON document.
    #[arg(long)]
    previous_state: Option<String>,
    /// Resulting state as a JSON document.
    #[arg(long)]
    new_state: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActorKind {
    Agent,
    Human,
    System,
}

impl From<ActorKind> for ActorType {
    fn from(kind: ActorKind) -> Self {
        match kind {
            ActorKind::Agent => ActorType::Agent,
            ActorKind::Human => ActorType::Human,
            ActorKind::System => ActorType::System,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("attestor: {}", e);
            return ExitCode::from(2);
        }
    };

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .compact()
        .init();

    match run(cli.command, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("attestor: {}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(cli: &Cli) -> AttestorResult<LedgerConfig> {
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(path) = &cli.ledger {
        config.storage = StorageConfig::File { path: path.clone() };
    }
    Ok(config)
}

// ── Command dispatch ──────────────────────────────────────────────────────────

/// Run one command. `Ok(false)` means the check it ran failed.
fn run(command: Command, config: &LedgerConfig) -> AttestorResult<bool> {
    let open = || config.open_ledger().map(IntegrityService::new);

    match command {
        Command::Demo => demo::run(config),
        Command::Append(args) => {
            let record = open()?.record(draft_from(args)?)?;
            print_json(&record)?;
            Ok(true)
        }
        Command::Verify { start, end } => {
            let service = open()?;
            let result = match end {
                Some(end) => service.verify_range(start, end),
                None => service.store().verify_chain(start, None),
            };
            Ok(report(&result))
        }
        Command::Scan => {
            let tampered = open()?.detect_tampering();
            print_json(&tampered)?;
            Ok(tampered.is_empty())
        }
        Command::Prove { entry_id } => match open()?.generate_inclusion_proof(&entry_id) {
            Some(proof) => {
                print_json(&proof)?;
                Ok(true)
            }
            None => {
                eprintln!("no entry with id '{}'", entry_id);
                Ok(false)
            }
        },
        Command::Export { start, end, out } => {
            let export = open()?.export_with_integrity_proofs(start, end)?;
            match out {
                Some(path) => write_json(&path, &export)?,
                None => print_json(&export)?,
            }
            Ok(true)
        }
        Command::CheckExport { path } => {
            let export: LedgerExport = read_json(&path)?;
            Ok(report(&verify_exported_audit_trail(&export)))
        }
        Command::CheckProof { path, root } => {
            let proof: MerkleProof = read_json(&path)?;
            let valid = proof.verify() && root.map_or(true, |r| r == proof.merkle_root);
            println!("{}", if valid { "proof valid" } else { "proof INVALID" });
            Ok(valid)
        }
    }
}

fn draft_from(args: AppendArgs) -> AttestorResult<NewEntry> {
    let mut draft = NewEntry::new(
        args.actor,
        args.actor_type.into(),
        args.action,
        args.entity_type,
        args.entity_id,
    );
    if let Some(id) = args.id {
        draft = draft.id(id);
    }
    if let Some(tenant) = args.tenant {
        draft = draft.tenant(tenant);
    }
    if let Some(rationale) = args.rationale {
        draft = draft.rationale(rationale);
    }
    if let Some(raw) = args.previous_state {
        draft = draft.previous_state(parse_state("previous_state", &raw)?);
    }
    if let Some(raw) = args.new_state {
        draft = draft.new_state(parse_state("new_state", &raw)?);
    }
    Ok(draft)
}

// ── I/O helpers ───────────────────────────────────────────────────────────────

fn parse_state(field: &str, raw: &str) -> AttestorResult<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| AttestorError::Validation {
        reason: format!("'{}' is not valid JSON: {}", field, e),
    })
}

fn report(result: &ChainVerificationResult) -> bool {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to render result: {}", e),
    }
    result.is_valid
}

fn print_json<T: Serialize>(value: &T) -> AttestorResult<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> AttestorResult<()> {
    fs::write(path, to_json(value)? + "\n").map_err(|e| AttestorError::StorageFailed {
        reason: format!("failed to write '{}': {}", path.display(), e),
    })?;
    debug!(path = %path.display(), "wrote output");
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> AttestorResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AttestorError::Serialization {
        reason: e.to_string(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AttestorResult<T> {
    let contents = fs::read_to_string(path).map_err(|e| AttestorError::StorageFailed {
        reason: format!("failed to read '{}': {}", path.display(), e),
    })?;
    serde_json::from_str(&contents).map_err(|e| AttestorError::Serialization {
        reason: format!("{}: {}", path.display(), e),
    })
}
