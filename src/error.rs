//! Error types for novel-sync
//!
//! This module provides the error taxonomy for the library:
//! - Domain-specific error types (Ledger, Publish, Translation, etc.)
//! - A crate-wide [`Result`] alias
//!
//! Two failure modes deliberately do NOT appear here because they are control
//! outcomes, not errors: a terminal translation failure (the current run stops
//! and the novel stays `in_progress`, see [`crate::types::NovelOutcome`]) and
//! user cancellation.

use thiserror::Error;

/// Result type alias for novel-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for novel-sync
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "backend.base_url")
        key: Option<String>,
    },

    /// Progress ledger error
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Source page could not be parsed into the expected records
    #[error("parse error: {0}")]
    Parse(String),

    /// Publishing backend returned a non-success HTTP status
    #[error("backend error: {status} - {message}")]
    Backend {
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// Chapter publishing failed partway through a run
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// Single-attempt translation failure (transient; retried by the policy)
    #[error("translation error: {0}")]
    Translation(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Progress ledger errors
///
/// A corrupt or unreadable ledger is fatal at startup: silently starting from
/// an empty ledger would re-publish everything the previous runs confirmed.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger file exists but could not be parsed
    #[error("ledger file {path} is corrupt: {reason}")]
    Corrupt {
        /// Path of the unparsable ledger file
        path: String,
        /// Parse failure detail
        reason: String,
    },

    /// Ledger file exists but could not be read
    #[error("failed to read ledger file {path}: {reason}")]
    Unreadable {
        /// Path of the unreadable ledger file
        path: String,
        /// I/O failure detail
        reason: String,
    },

    /// Ledger file could not be written
    #[error("failed to write ledger file {path}: {reason}")]
    WriteFailed {
        /// Path of the ledger file
        path: String,
        /// I/O failure detail
        reason: String,
    },
}

/// Chapter publishing errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// An individual chapter create failed during the per-chapter fallback
    ///
    /// This halts the whole publish operation: continuing past a failed
    /// chapter would leave a gap in the sequence.
    #[error("failed to publish chapter {number}: {reason}")]
    ChapterFailed {
        /// 1-based sequence number of the chapter that failed
        number: u32,
        /// Failure detail from the backend call
        reason: String,
    },
}
