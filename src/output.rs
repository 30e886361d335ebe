//! Result types returned by the conversion entry points.

use crate::document::{SectionKind, TrialDocument};
use crate::error::TableError;
use serde::{Deserialize, Serialize};

/// Everything produced by one conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The rendered markdown document.
    pub markdown: String,
    /// The structured tree the markdown was rendered from.
    pub document: TrialDocument,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Tables that could not be normalised, in section order.
    pub fn failures(&self) -> Vec<&TableError> {
        self.document.failures().collect()
    }

    pub fn has_failures(&self) -> bool {
        self.document.failures().next().is_some()
    }
}

/// Counters for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub sections_found: usize,
    /// Raw tables found inside matching sections.
    pub tables_found: usize,
    pub tables_converted: usize,
    /// Tables left empty by cleaning, or context tables when those are off.
    pub tables_skipped: usize,
    pub tables_failed: usize,
    pub footnotes_emitted: usize,
    pub duration_ms: u64,
}

/// What [`crate::inspect`] reports about a page without rendering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectReport {
    pub trial_id: Option<String>,
    pub title: Option<String>,
    pub sections: Vec<SectionSummary>,
    /// Footnote definitions found anywhere on the page.
    pub footnote_definitions: usize,
    /// All tables on the page, inside a section or not.
    pub total_tables: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub kind: SectionKind,
    pub heading: String,
    pub tables: usize,
}
