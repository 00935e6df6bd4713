//! Error types for the Attestor ledger.
//!
//! Only operations that can genuinely fail return `AttestorResult<T>`:
//! ingress validation, storage I/O, configuration, and (de)serialization.
//! Hash and linkage mismatches are findings reported through
//! `ChainVerificationResult` and are never surfaced as errors.

use thiserror::Error;

/// The unified error type for the Attestor crates.
#[derive(Debug, Error)]
pub enum AttestorError {
    /// A submitted entry is missing a required field or is otherwise malformed.
    ///
    /// Raised at the ingress boundary, before anything reaches the ledger.
    #[error("entry validation failed: {reason}")]
    Validation { reason: String },

    /// An entry with the same id has already been appended.
    #[error("duplicate entry id '{id}'")]
    DuplicateId { id: String },

    /// The backing journal could not durably persist a record.
    ///
    /// The append that hit this error did not consume a sequence number.
    #[error("ledger storage failed: {reason}")]
    StorageFailed { reason: String },

    /// A requested sequence range contains no entries.
    #[error("invalid range {start}..={end} for a ledger of {count} entries")]
    InvalidRange { start: u64, end: u64, count: u64 },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A record, proof, or export could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

/// Convenience alias used throughout the Attestor crates.
pub type AttestorResult<T> = Result<T, AttestorError>;
