//! # trial2md
//!
//! Convert the result tables of clinical-trial web pages ("Outcome Results",
//! "Adverse Effects") into clean, deterministic Markdown.
//!
//! Trial pages are inconsistently structured: tables hide inside nested
//! cards, header cells span several arms, rows come up short, and footnote
//! markers are glued onto values. This crate finds the two result sections,
//! expands every table into a rectangular grid, moves footnote markers out
//! of the cell text into a footnote block under each table, and renders the
//! lot as one Markdown document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML
//!  │
//!  ├─ 1. Input     read a local file or fetch a URL
//!  ├─ 2. Parse     typed headings + raw tables + footnote definitions
//!  ├─ 3. Locate    Outcome Results / Adverse Effects regions
//!  ├─ 4. Grid      rowspan/colspan → rectangular grid
//!  ├─ 5. Footnotes strip known markers, attach definitions
//!  ├─ 6. Clean     whitespace, boilerplate, repeated header rows
//!  ├─ 7. Render    one Markdown table per grid
//!  └─ 8. Assemble  heading, sections, final polish
//! ```
//!
//! Steps 2–8 are pure: [`process`] never fails and never does I/O.
//!
//! ## Quick Start
//!
//! ```rust
//! let html = r#"<h2>Outcome Results</h2>
//!   <table><tr><th>Arm</th><th>Mean</th></tr>
//!          <tr><td>Placebo</td><td>12.3 a</td></tr></table>
//!   <ol class="footnotes"><li>a. p&lt;0.05</li></ol>"#;
//!
//! let markdown = trial2md::process(html);
//! assert!(markdown.contains("| Placebo | 12.3 |"));
//! assert!(markdown.contains("a: p<0.05"));
//! ```
//!
//! From a file or URL, with failure reporting:
//!
//! ```rust,no_run
//! use trial2md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("https://clinicaltrials.gov/study/NCT01234567?tab=results", &config).await?;
//!     for failure in output.failures() {
//!         eprintln!("skipped: {failure}");
//!     }
//!     println!("{}", output.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `trial2md` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! trial2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, GridLimits, MarkdownOptions};
pub use convert::{
    convert, convert_sync, convert_to_file, inspect, inspect_html, process, process_with_config,
};
pub use document::{
    Cell, ColumnGroup, Footnote, Section, SectionKind, Table, TableKind, TrialDocument,
};
pub use error::{TableError, Trial2MdError};
pub use output::{ConversionOutput, ConversionStats, InspectReport, SectionSummary};
pub use pipeline::input::{fetch_html, read_local_html};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
