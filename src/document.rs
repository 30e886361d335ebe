//! The in-memory result tree for one processed page.
//!
//! ```text
//! TrialDocument
//!  └─ Section (OutcomeResults | AdverseEffects)  ≤ 1 per kind
//!      └─ Table  (rectangular: every row has column_count cells)
//!          ├─ Cell      text + span origin + footnote markers
//!          └─ Footnote  only those referenced by a Cell
//! ```
//!
//! Every entity is owned by its parent; nothing is shared between pages.

use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root result of processing one HTML page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialDocument {
    /// Registry identifier such as `NCT01234567`, when one appears on the page.
    pub trial_id: Option<String>,
    /// Page title; empty when the page has none.
    pub title: String,
    /// Sections in canonical order (Outcome Results first).
    pub sections: Vec<Section>,
}

impl TrialDocument {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn table_count(&self) -> usize {
        self.sections.iter().map(|s| s.tables.len()).sum()
    }

    /// All table failures across every section, in section order.
    pub fn failures(&self) -> impl Iterator<Item = &TableError> {
        self.sections.iter().flat_map(|s| s.failures.iter())
    }
}

/// The two result categories recognised on a trial page.
///
/// The derived `Ord` is the output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    OutcomeResults,
    AdverseEffects,
}

impl SectionKind {
    pub const ALL: [SectionKind; 2] = [SectionKind::OutcomeResults, SectionKind::AdverseEffects];

    /// Canonical heading used in the rendered document.
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::OutcomeResults => "Outcome Results",
            SectionKind::AdverseEffects => "Adverse Effects",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A named region of the page holding its normalised tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    /// Heading text as it appeared on the page.
    pub heading: String,
    pub tables: Vec<Table>,
    /// Tables in this section that could not be normalised.
    pub failures: Vec<TableError>,
}

impl Section {
    pub fn new(kind: SectionKind, heading: impl Into<String>) -> Self {
        Self {
            kind,
            heading: heading.into(),
            tables: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Whether a table holds result data or key/value context prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableKind {
    #[default]
    Data,
    /// Two-column label/value table ("Time Frame", "Description", …).
    Context,
}

/// An arm/group label covering a contiguous range of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnGroup {
    pub label: String,
    /// First covered column (inclusive).
    pub start: usize,
    /// Last covered column (exclusive).
    pub end: usize,
}

/// A normalised rectangular grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
    pub column_count: usize,
    pub groups: Vec<ColumnGroup>,
    pub caption: Option<String>,
    /// Nearest sub-heading preceding the table inside its section.
    pub title: Option<String>,
    pub kind: TableKind,
    /// Referenced footnotes, ordered by first appearance.
    pub footnotes: Vec<Footnote>,
}

impl Table {
    /// Build a table from plain strings, padding short rows.
    ///
    /// Each cell's origin is its own position. Mostly useful in tests and
    /// for callers that already hold a clean grid.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grid: Vec<Vec<Cell>> = rows
            .into_iter()
            .enumerate()
            .map(|(r, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(c, text)| Cell::new(text, (r, c)))
                    .collect()
            })
            .collect();
        let column_count = grid.iter().map(Vec::len).max().unwrap_or(0);
        for (r, row) in grid.iter_mut().enumerate() {
            while row.len() < column_count {
                let c = row.len();
                row.push(Cell::new("", (r, c)));
            }
        }
        Self {
            rows: grid,
            column_count,
            ..Self::default()
        }
    }

    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.column_count)
    }

    /// Row texts, handy for comparisons.
    pub fn texts(&self) -> Vec<Vec<&str>> {
        self.rows
            .iter()
            .map(|r| r.iter().map(|c| c.text.as_str()).collect())
            .collect()
    }

    /// Marker ids in row-major reading order, first appearance only.
    pub fn referenced_markers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for cell in self.rows.iter().flatten() {
            for m in &cell.markers {
                if !out.contains(&m.as_str()) {
                    out.push(m);
                }
            }
        }
        out
    }
}

/// One logical grid position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    /// `(row, column)` of the source cell this position was expanded from.
    pub origin: (usize, usize),
    /// Footnote marker ids found in the source text (ordered, no duplicates).
    pub markers: Vec<String>,
    pub is_header: bool,
}

impl Cell {
    pub fn new(text: impl Into<String>, origin: (usize, usize)) -> Self {
        Self {
            text: text.into(),
            origin,
            markers: Vec::new(),
            is_header: false,
        }
    }

    pub fn header(text: impl Into<String>, origin: (usize, usize)) -> Self {
        Self {
            is_header: true,
            ..Self::new(text, origin)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A footnote definition: marker id plus its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    pub marker: String,
    pub text: String,
}

impl Footnote {
    pub fn new(marker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            text: text.into(),
        }
    }
}
