//! JSON Lines journal.
//!
//! One `ImmutableEntry` per line, appended in sequence order. Each append is
//! a single `write_all` of the full line followed by `sync_data`. If either
//! fails, the file is truncated back to its length before the append, so a
//! rejected record leaves nothing behind. A crash mid-write, or a rollback
//! that itself fails, can still leave a line without its trailing newline.
//! `load` drops such a torn tail, and `persist` never appends after one: it
//! cuts the file back to the last length it committed, or refuses to write.

use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use attestor_chain::ImmutableEntry;
use attestor_contracts::{AttestorError, AttestorResult};
use attestor_core::Journal;

/// Journal backed by an append-only JSON Lines file.
#[derive(Debug, Clone)]
pub struct FileJournal {
    path: PathBuf,
    /// File length after the last record this journal loaded or wrote.
    committed_len: Option<u64>,
}

impl FileJournal {
    /// Journal at `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            committed_len: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length to append at. A file that does not end in a newline is cut
    /// back to `committed_len`; without a known committed length nothing is
    /// written.
    fn clean_tail(&self, file: &mut File) -> AttestorResult<u64> {
        let len = file
            .metadata()
            .map_err(|e| self.storage_error("stat journal", e))?
            .len();
        if len == 0 {
            return Ok(0);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|e| self.storage_error("read journal tail", e))?;
        if last[0] == b'\n' {
            return Ok(len);
        }

        match self.committed_len {
            Some(committed) if committed < len => {
                warn!(
                    path = %self.path.display(),
                    dropped_bytes = len - committed,
                    "cutting partial record from journal before append"
                );
                file.set_len(committed)
                    .map_err(|e| self.storage_error("truncate journal", e))?;
                Ok(committed)
            }
            _ => Err(AttestorError::StorageFailed {
                reason: format!(
                    "journal '{}' ends with a partial record; reopen the ledger to repair it",
                    self.path.display()
                ),
            }),
        }
    }

    fn storage_error(&self, action: &str, e: std::io::Error) -> AttestorError {
        AttestorError::StorageFailed {
            reason: format!("failed to {} '{}': {}", action, self.path.display(), e),
        }
    }
}

impl Journal for FileJournal {
    fn load(&mut self) -> AttestorResult<Vec<ImmutableEntry>> {
        let mut contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.committed_len = Some(0);
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.storage_error("read journal", e)),
        };

        if !contents.is_empty() && !contents.ends_with('\n') {
            let keep = contents.rfind('\n').map(|i| i + 1).unwrap_or(0);
            warn!(
                path = %self.path.display(),
                dropped_bytes = contents.len() - keep,
                "dropping torn write at end of journal"
            );
            let file = OpenOptions::new()
                .write(true)
                .open(&self.path)
                .map_err(|e| self.storage_error("open journal", e))?;
            file.set_len(keep as u64)
                .and_then(|_| file.sync_data())
                .map_err(|e| self.storage_error("truncate journal", e))?;
            contents.truncate(keep);
        }

        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ImmutableEntry =
                serde_json::from_str(line).map_err(|e| AttestorError::Serialization {
                    reason: format!("{}:{}: {}", self.path.display(), index + 1, e),
                })?;
            records.push(record);
        }

        self.committed_len = Some(contents.len() as u64);
        debug!(path = %self.path.display(), records = records.len(), "journal loaded");
        Ok(records)
    }

    fn persist(&mut self, record: &ImmutableEntry) -> AttestorResult<()> {
        let mut line = serde_json::to_string(record).map_err(|e| AttestorError::Serialization {
            reason: format!("failed to encode record {}: {}", record.sequence_number(), e),
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.storage_error("open journal", e))?;
        let committed_len = self.clean_tail(&mut file)?;

        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.sync_data()) {
            if let Err(rollback) = file.set_len(committed_len) {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial journal write"
                );
            }
            return Err(self.storage_error("append to journal", e));
        }

        self.committed_len = Some(committed_len + line.len() as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use serde_json::json;

    use attestor_chain::{ImmutableEntry, GENESIS_HASH};
    use attestor_contracts::{AttestorError, NewEntry};
    use attestor_core::{IntegrityService, Journal, LedgerStore};

    use super::FileJournal;
    use crate::Ledger;

    fn draft(id: &str) -> NewEntry {
        NewEntry::human("auditor", "attest", "report", "r-2024")
            .id(id)
            .new_state(json!({ "attested": true, "findings": [] }))
    }

    fn open(path: &std::path::Path) -> Ledger<FileJournal> {
        Ledger::open(FileJournal::new(path)).unwrap()
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(&dir.path().join("ledger.jsonl"));
        assert_eq!(ledger.entry_count(), 0);
    }

    /// A reopened ledger holds the same records and keeps chaining from the
    /// stored tip.
    #[test]
    fn reopen_continues_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let tip = {
            let ledger = open(&path);
            ledger.append(draft("A").into_entry().unwrap()).unwrap();
            ledger.append(draft("B").into_entry().unwrap()).unwrap()
        };

        let ledger = open(&path);
        assert_eq!(ledger.entry_count(), 2);
        assert_eq!(ledger.get_entry_by_id("B"), Some(tip.clone()));

        let next = ledger.append(draft("C").into_entry().unwrap()).unwrap();
        assert_eq!(next.sequence_number(), 2);
        assert_eq!(next.previous_hash(), tip.entry_hash());
        assert!(ledger.verify_chain(0, None).is_valid);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    /// Editing a line of the journal on disk is caught after reopening.
    #[test]
    fn edited_journal_line_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        {
            let ledger = open(&path);
            for id in ["A", "B", "C"] {
                ledger.append(draft(id).into_entry().unwrap()).unwrap();
            }
        }

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
        let mut raw: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        raw["rationale"] = json!("inserted after the fact");
        lines[1] = raw.to_string();
        fs::write(&path, lines.join("\n") + "\n").unwrap();

        let service = IntegrityService::new(Arc::new(open(&path)));
        assert_eq!(service.detect_tampering(), vec![1]);
        let result = service.verify_full_chain();
        assert_eq!(result.first_invalid_sequence, Some(1));
        assert_eq!(result.verified_entries, 1);
    }

    #[test]
    fn torn_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        {
            let ledger = open(&path);
            ledger.append(draft("A").into_entry().unwrap()).unwrap();
        }
        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push_str("{\"id\":\"B\",\"tenant");
        fs::write(&path, &contents).unwrap();

        let ledger = open(&path);
        assert_eq!(ledger.entry_count(), 1);
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));

        let next = ledger.append(draft("B").into_entry().unwrap()).unwrap();
        assert_eq!(next.sequence_number(), 1);
        assert!(ledger.verify_chain(0, None).is_valid);
    }

    /// Partial bytes left behind after the ledger opened are cut before the
    /// next append, so the file stays loadable.
    #[test]
    fn append_after_torn_bytes_keeps_journal_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let ledger = open(&path);
        ledger.append(draft("A").into_entry().unwrap()).unwrap();

        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push_str("{\"id\":\"lost\",\"act");
        fs::write(&path, &contents).unwrap();

        ledger.append(draft("B").into_entry().unwrap()).unwrap();
        drop(ledger);

        let reopened = open(&path);
        assert_eq!(reopened.entry_count(), 2);
        assert!(reopened.verify_chain(0, None).is_valid);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    /// With no known committed length, a torn file is left untouched and the
    /// write is refused on every attempt.
    #[test]
    fn unknown_torn_tail_refuses_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        fs::write(&path, "{\"id\":\"half").unwrap();

        let record = ImmutableEntry::from_entry(draft("A").into_entry().unwrap(), 0, GENESIS_HASH);
        let mut journal = FileJournal::new(&path);
        for _ in 0..3 {
            let err = journal.persist(&record).unwrap_err();
            assert!(err.to_string().contains("partial record"));
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"half");
    }

    #[test]
    fn malformed_line_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        fs::write(&path, "not json\n").unwrap();

        let err = Ledger::open(FileJournal::new(&path)).err().unwrap();
        assert!(matches!(err, AttestorError::Serialization { .. }));
        assert!(err.to_string().contains(":1:"));
    }

    #[test]
    fn unwritable_path_fails_append_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("ledger.jsonl");
        let ledger = open(&path);

        let err = ledger.append(draft("A").into_entry().unwrap()).unwrap_err();
        assert!(matches!(err, AttestorError::StorageFailed { .. }));
        assert_eq!(ledger.entry_count(), 0);
    }
}
