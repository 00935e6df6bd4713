//! The append-only ledger store.
//!
//! `Ledger` keeps committed records in a `Vec` behind an `RwLock` and
//! commits new ones through a `Journal` held behind a `Mutex`. The journal
//! mutex is the append critical section: it is held from reading the tip
//! hash until the new record is published, so two appends can never race on
//! a sequence number or chain against a stale tip. The record is pushed to
//! the shared state only after the journal accepted it, so readers never see
//! an uncommitted record and a failed write never consumes a sequence
//! number.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::{debug, info, warn};

use attestor_chain::{ImmutableEntry, GENESIS_HASH};
use attestor_contracts::{AttestorError, AttestorResult, Entry};
use attestor_core::{Journal, LedgerStore};

use crate::memory::MemoryJournal;

// ── Internal state ────────────────────────────────────────────────────────────

/// Committed records and the id index.
#[derive(Default)]
pub(crate) struct LedgerState {
    /// Every committed record, position == sequence number.
    pub(crate) records: Vec<ImmutableEntry>,

    /// Entry id → position in `records`.
    pub(crate) by_id: HashMap<String, usize>,
}

impl LedgerState {
    fn tip_hash(&self) -> String {
        self.records
            .last()
            .map(|r| r.entry_hash().to_string())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }
}

// ── Public store ──────────────────────────────────────────────────────────────

/// An append-only, hash-chained ledger committed through a `Journal`.
///
/// # Thread safety
///
/// `append` serializes on the journal mutex. Lookups, scans, and exports
/// take only the state read lock and run concurrently with each other.
pub struct Ledger<J: Journal = MemoryJournal> {
    tenant_id: Option<String>,
    append_retries: u32,
    journal: Mutex<J>,
    pub(crate) state: RwLock<LedgerState>,
}

impl Ledger<MemoryJournal> {
    /// An empty ledger with no durable storage.
    pub fn in_memory() -> Self {
        Self::from_parts(MemoryJournal, LedgerState::default())
    }
}

impl<J: Journal> Ledger<J> {
    /// Open a ledger over `journal`, hydrating it with every stored record.
    ///
    /// Stored records are loaded as-is. Tampered or out-of-place records are
    /// kept so verification can report them; only an unreadable journal is
    /// an error.
    pub fn open(mut journal: J) -> AttestorResult<Self> {
        let records = journal.load()?;

        let mut state = LedgerState::default();
        for (position, record) in records.into_iter().enumerate() {
            if record.sequence_number() != position as u64 {
                warn!(
                    position,
                    sequence = record.sequence_number(),
                    "stored record is out of place"
                );
            }
            if state.by_id.contains_key(record.id()) {
                warn!(entry_id = %record.id(), position, "duplicate entry id in journal; keeping first");
            } else {
                state.by_id.insert(record.id().to_string(), position);
            }
            state.records.push(record);
        }

        info!(entries = state.records.len(), tip = %state.tip_hash(), "ledger opened");
        Ok(Self::from_parts(journal, state))
    }

    /// Scope the ledger to one tenant.
    ///
    /// Entries without a tenant inherit it; entries for another tenant are
    /// rejected.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Retry a failed journal write up to `retries` more times.
    pub fn with_append_retries(mut self, retries: u32) -> Self {
        self.append_retries = retries;
        self
    }

    fn from_parts(journal: J, state: LedgerState) -> Self {
        Self {
            tenant_id: None,
            append_retries: 0,
            journal: Mutex::new(journal),
            state: RwLock::new(state),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        // Publishing is a plain push; a poisoned lock still holds whole records.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn scope_to_tenant(&self, entry: &mut Entry) -> AttestorResult<()> {
        let Some(tenant) = &self.tenant_id else {
            return Ok(());
        };
        match &entry.tenant_id {
            None => {
                entry.tenant_id = Some(tenant.clone());
                Ok(())
            }
            Some(t) if t == tenant => Ok(()),
            Some(other) => Err(AttestorError::Validation {
                reason: format!("entry for tenant '{}' submitted to ledger of tenant '{}'", other, tenant),
            }),
        }
    }

    fn persist(&self, journal: &mut J, record: &ImmutableEntry) -> AttestorResult<()> {
        let attempts = self.append_retries + 1;
        let mut attempt = 1;
        loop {
            match journal.persist(record) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!(
                        sequence = record.sequence_number(),
                        attempt,
                        error = %e,
                        "journal write failed, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        sequence = record.sequence_number(),
                        attempts,
                        error = %e,
                        "journal write failed, append abandoned"
                    );
                    return Err(e);
                }
            }
        }
    }
}

// ── LedgerStore impl ──────────────────────────────────────────────────────────

impl<J: Journal> LedgerStore for Ledger<J> {
    /// Seal `entry` at the next sequence number, persist it, then publish it.
    ///
    /// Returns `Err(StorageFailed)` if the journal rejects the record after
    /// all retries; the sequence number is not consumed.
    fn append(&self, mut entry: Entry) -> AttestorResult<ImmutableEntry> {
        self.scope_to_tenant(&mut entry)?;

        let mut journal = self.journal.lock().map_err(|e| AttestorError::StorageFailed {
            reason: format!("append lock poisoned: {}", e),
        })?;

        let (sequence, previous_hash) = {
            let state = self.read_state();
            if state.by_id.contains_key(&entry.id) {
                return Err(AttestorError::DuplicateId { id: entry.id });
            }
            (state.records.len() as u64, state.tip_hash())
        };

        let record = ImmutableEntry::from_entry(entry, sequence, previous_hash);
        self.persist(&mut journal, &record)?;

        {
            let mut state = self.write_state();
            let position = state.records.len();
            state.by_id.insert(record.id().to_string(), position);
            state.records.push(record.clone());
        }

        info!(
            sequence,
            entry_id = %record.id(),
            action = %record.entry().action,
            entry_hash = %record.entry_hash(),
            "entry appended"
        );
        Ok(record)
    }

    fn get_entry(&self, sequence_number: u64) -> Option<ImmutableEntry> {
        let index = usize::try_from(sequence_number).ok()?;
        self.read_state().records.get(index).cloned()
    }

    fn get_entry_by_id(&self, id: &str) -> Option<ImmutableEntry> {
        let state = self.read_state();
        let index = *state.by_id.get(id)?;
        state.records.get(index).cloned()
    }

    fn entry_count(&self) -> u64 {
        self.read_state().records.len() as u64
    }

    fn position_of(&self, id: &str) -> Option<u64> {
        self.read_state().by_id.get(id).map(|&index| index as u64)
    }

    fn entries_in_range(&self, start: u64, end: u64) -> Vec<ImmutableEntry> {
        let state = self.read_state();
        let len = state.records.len() as u64;
        if len == 0 || start >= len || start > end {
            return Vec::new();
        }
        let end = end.min(len - 1);
        debug!(start, end, "reading ledger range");
        state.records[start as usize..=end as usize].to_vec()
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
