//! Progress-callback trait for per-table conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to hear
//! about each table as the pipeline normalises it. The CLI uses this to
//! print failed tables by section name while the rest of the page keeps
//! converting.
//!
//! # Example
//!
//! ```rust
//! use trial2md::{ConversionConfig, ConversionProgressCallback, SectionKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Failures(AtomicUsize);
//!
//! impl ConversionProgressCallback for Failures {
//!     fn on_table_error(&self, _section: SectionKind, _table: usize, _error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Failures(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::document::SectionKind;
use std::sync::Arc;

/// Called by the pipeline as it processes each table.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events fire synchronously, in document order.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after sections are located, before any table is normalised.
    ///
    /// # Arguments
    /// * `total_tables` — number of raw tables found inside matching sections
    fn on_conversion_start(&self, total_tables: usize) {
        let _ = total_tables;
    }

    /// Called when a table is normalised, resolved and cleaned.
    ///
    /// # Arguments
    /// * `section` — owning section
    /// * `table`   — 1-based index within the section
    /// * `rows`    — rows left after cleaning
    fn on_table_complete(&self, section: SectionKind, table: usize, rows: usize) {
        let _ = (section, table, rows);
    }

    /// Called when a table cannot be normalised.
    fn on_table_error(&self, section: SectionKind, table: usize, error: &str) {
        let _ = (section, table, error);
    }

    /// Called once after every table has been attempted.
    fn on_conversion_complete(&self, total_tables: usize, success_count: usize) {
        let _ = (total_tables, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
