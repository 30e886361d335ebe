//! Error types for the trial2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Trial2MdError`] — **Fatal**: the page could not be obtained or the
//!   output could not be written (missing file, HTTP failure, bad config).
//!   Returned as `Err(Trial2MdError)` from the `convert*` collaborators. The
//!   pure core ([`crate::process`]) never returns it.
//!
//! * [`TableError`] — **Non-fatal**: a single table could not be normalised
//!   into a rectangular grid. Stored on the owning
//!   [`crate::document::Section`] so every sibling table and section is
//!   still rendered.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the trial2md library.
#[derive(Debug, Error)]
pub enum Trial2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("HTML file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input was read but contains no markup at all.
    #[error("Input '{input}' does not look like HTML (no tags found)")]
    NotHtml { input: String },

    /// The input string is neither a readable path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    // ── Network errors ────────────────────────────────────────────────────
    /// The URL was syntactically valid but the fetch failed.
    #[error("Failed to fetch '{url}': {reason}\nCheck your internet connection.")]
    FetchFailed { url: String, reason: String },

    /// The fetch exceeded the configured timeout.
    #[error("Fetch timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    FetchTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single table.
///
/// `section` is the display name of the owning section and `table` the
/// 1-based position of the table inside it, so the CLI can report failures
/// by name.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TableError {
    /// Span declarations overlap and cannot be resolved even with padding.
    #[error("{section}, table {table}: malformed structure: {detail}")]
    MalformedStructure {
        section: String,
        table: usize,
        detail: String,
    },

    /// The expanded grid exceeds the configured size limits.
    #[error("{section}, table {table}: {detail} (limit {limit})")]
    TooLarge {
        section: String,
        table: usize,
        detail: String,
        limit: usize,
    },
}

impl TableError {
    /// Display name of the section the failed table belongs to.
    pub fn section(&self) -> &str {
        match self {
            TableError::MalformedStructure { section, .. } | TableError::TooLarge { section, .. } => {
                section
            }
        }
    }

    /// 1-based index of the failed table within its section.
    pub fn table(&self) -> usize {
        match self {
            TableError::MalformedStructure { table, .. } | TableError::TooLarge { table, .. } => {
                *table
            }
        }
    }
}
