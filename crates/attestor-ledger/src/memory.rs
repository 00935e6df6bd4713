//! Journal with no durable storage.
//!
//! The ledger's own record list is the only copy; everything is lost when
//! the ledger is dropped. Suitable for tests and for short-lived ledgers
//! that are exported before shutdown.

use attestor_chain::ImmutableEntry;
use attestor_contracts::AttestorResult;
use attestor_core::Journal;

#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryJournal;

impl Journal for MemoryJournal {
    fn load(&mut self) -> AttestorResult<Vec<ImmutableEntry>> {
        Ok(Vec::new())
    }

    fn persist(&mut self, _record: &ImmutableEntry) -> AttestorResult<()> {
        Ok(())
    }
}
