use std::path::PathBuf;

use thiserror::Error;

/// Storage-specific error types for the badgelock access control system.
///
/// These errors cover the registry file and the audit trail. The tick path
/// never propagates them: registry failures fall back to the cached
/// snapshot and audit failures are reported and skipped.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a backing file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry content could not be serialized or deserialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Registry file exists but cannot be parsed
    #[error("Malformed registry {path}: {message}")]
    MalformedRegistry { path: PathBuf, message: String },

    /// Record rejected by domain validation
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] badgelock_core::Error),

    /// Audit sink is unusable
    #[error("Audit log unavailable: {0}")]
    AuditUnavailable(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
