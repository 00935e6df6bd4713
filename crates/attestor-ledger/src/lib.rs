//! # attestor-ledger
//!
//! The concrete `LedgerStore`: an append-only, hash-chained record list
//! guarded for concurrent appends, with pluggable durability.
//!
//! - `Ledger<MemoryJournal>` keeps everything in process.
//! - `Ledger<FileJournal>` writes each committed record as one JSON line and
//!   rebuilds itself from that file on open.
//! - `LedgerConfig` selects between them from a TOML document.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use attestor_ledger::{FileJournal, Ledger};
//!
//! let ledger = Ledger::open(FileJournal::new("ledger.jsonl"))?
//!     .with_tenant("acme")
//!     .with_append_retries(3);
//! ```

pub mod config;
pub mod file;
pub mod ledger;
pub mod memory;

pub use config::{LedgerConfig, StorageConfig};
pub use file::FileJournal;
pub use ledger::Ledger;
pub use memory::MemoryJournal;
