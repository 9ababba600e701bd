//! Error types for Nereid operations.
//!
//! ## Error Categorization
//!
//! Errors split along the same 4xx/5xx line the rest of the crate uses:
//!
//! - Caller problems: [`Error::InvalidParameter`], [`Error::MalformedRecord`],
//!   [`Error::Config`]. These are rejected before any store access where possible.
//! - Storage problems: [`Error::StorageUnavailable`], [`Error::Database`],
//!   [`Error::PartialRebuildPrevented`]. None of them are retried internally;
//!   retry policy belongs to the caller.
//!
//! A failed rebuild never leaves a partial edge set behind. When
//! [`Error::PartialRebuildPrevented`] is returned, the previous generation is
//! still the one readers see.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::types::RepoKey;

/// Result type for Nereid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Nereid operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The database could not be opened, was locked past the busy timeout,
    /// or failed at the I/O level.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] rusqlite::Error),

    /// Any other database failure (constraint violations, bad SQL, ...)
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// A caller-supplied argument was rejected before touching the store
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A rebuild transaction aborted after it started; it was rolled back and
    /// the previous edge set for `key` is still intact.
    #[error("edge rebuild for {key} aborted and rolled back: {source}")]
    PartialRebuildPrevented {
        /// The `(owner, repo)` key whose rebuild failed
        key: RepoKey,
        /// The failure that aborted the transaction
        #[source]
        source: rusqlite::Error,
    },

    /// A traversal observed its cancellation flag at a frontier boundary
    #[error("traversal cancelled before expanding depth {depth}")]
    Cancelled {
        /// The depth level that was about to be expanded
        depth: u32,
    },

    /// A line of occurrence input could not be parsed
    #[error("malformed document record at line {line}: {source}")]
    MalformedRecord {
        /// 1-based line number in the input
        line: usize,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration file or values
    #[error("configuration error: {0}")]
    Config(String),

    /// Invariant violation inside Nereid (poisoned lock, ...)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        if is_unavailable(&error) {
            Self::StorageUnavailable(error)
        } else {
            Self::Database(error)
        }
    }
}

/// Returns `true` when a `SQLite` failure means "the store cannot be reached"
/// rather than "this statement was wrong".
fn is_unavailable(error: &rusqlite::Error) -> bool {
    matches!(
        error.sqlite_error_code(),
        Some(
            ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::DiskFull
        )
    )
}

impl Error {
    /// Returns `true` if the caller supplied something invalid (4xx-style).
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::MalformedRecord { .. } | Self::Config(_)
        )
    }

    /// Returns `true` if the store failed (5xx-style).
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::Database(_) | Self::PartialRebuildPrevented { .. }
        )
    }

    /// Convenience constructor for [`Error::InvalidParameter`].
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}
