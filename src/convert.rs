//! Conversion entry points.
//!
//! [`process`] and [`process_with_config`] are the pure core: raw HTML in,
//! markdown out, no I/O and no failure modes. The `convert*` functions wrap
//! them with input resolution and file output, and are the only ones that
//! return [`Trial2MdError`].

use crate::config::ConversionConfig;
use crate::document::{Section, Table, TableKind, TrialDocument};
use crate::error::Trial2MdError;
use crate::output::{ConversionOutput, ConversionStats, InspectReport, SectionSummary};
use crate::pipeline::footnotes::{self, MarkerVocabulary};
use crate::pipeline::grid::{self, GridFault};
use crate::pipeline::locate::{self, LocatedTable};
use crate::pipeline::parse::{self, Block};
use crate::pipeline::{assemble, clean, input};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert raw HTML to markdown with the default configuration.
///
/// Pure and deterministic: the same input always yields the same string.
/// A page without result sections still yields a document heading.
///
/// # Example
/// ```rust
/// let html = r#"<h2>Adverse Effects</h2>
///   <table><tr><th>Event</th><th>Placebo</th></tr>
///          <tr><td>Nausea</td><td>3 a</td></tr></table>
///   <ul class="footnotes"><li>a. Mild only</li></ul>"#;
/// let md = trial2md::process(html);
/// assert!(md.contains("| Nausea | 3 |"));
/// assert!(md.contains("a: Mild only"));
/// ```
pub fn process(raw_html: &str) -> String {
    process_with_config(raw_html, &ConversionConfig::default()).markdown
}

/// Convert raw HTML to markdown plus the structured document and stats.
///
/// Never fails as a whole. A table that cannot be normalised is recorded
/// on its section (see [`ConversionOutput::failures`]) and every other
/// table is still rendered.
pub fn process_with_config(raw_html: &str, config: &ConversionConfig) -> ConversionOutput {
    let start = Instant::now();

    // ── Step 1: Parse into typed blocks ──────────────────────────────────
    let page = parse::parse_page(raw_html);
    let vocab = MarkerVocabulary::new(&page.footnotes);

    // ── Step 2: Locate sections ──────────────────────────────────────────
    let located = locate::locate_sections(&page.blocks);
    let tables_found: usize = located.iter().map(|s| s.tables.len()).sum();
    debug!(
        "Located {} sections with {} tables, {} footnote markers",
        located.len(),
        tables_found,
        vocab.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(tables_found);
    }

    // ── Step 3: Normalise, resolve and clean each table ──────────────────
    let mut stats = ConversionStats {
        sections_found: located.len(),
        tables_found,
        ..ConversionStats::default()
    };
    let mut sections = Vec::with_capacity(located.len());

    for loc in &located {
        let mut section = Section::new(loc.kind, loc.heading.clone());
        for (i, lt) in loc.tables.iter().enumerate() {
            let index = i + 1;
            match build_table(lt, &vocab, config) {
                Ok(Some(table)) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_table_complete(loc.kind, index, table.rows.len());
                    }
                    stats.tables_converted += 1;
                    section.tables.push(table);
                }
                Ok(None) => {
                    debug!("{}, table {}: nothing left to render", loc.kind, index);
                    stats.tables_skipped += 1;
                }
                Err(fault) => {
                    let err = fault.at(loc.kind, index);
                    warn!("{}", err);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_table_error(loc.kind, index, &err.to_string());
                    }
                    stats.tables_failed += 1;
                    section.failures.push(err);
                }
            }
        }
        sections.push(section);
    }

    // ── Step 4: Assemble ─────────────────────────────────────────────────
    let document = TrialDocument {
        trial_id: page.trial_id,
        title: page.title.unwrap_or_default(),
        sections,
    };
    let markdown = assemble::assemble(&document, config);

    if config.include_footnotes {
        stats.footnotes_emitted = document
            .sections
            .iter()
            .flat_map(|s| s.tables.iter())
            .map(|t| t.footnotes.len())
            .sum();
    }
    stats.duration_ms = start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(tables_found, stats.tables_converted);
    }

    ConversionOutput {
        markdown,
        document,
        stats,
    }
}

fn build_table(
    located: &LocatedTable<'_>,
    vocab: &MarkerVocabulary,
    config: &ConversionConfig,
) -> Result<Option<Table>, GridFault> {
    let mut table = grid::normalize(located.raw, &config.limits)?;
    table.title = located.title.clone();

    footnotes::resolve_table(&mut table, vocab);
    let mut table = clean::clean_table(table);
    footnotes::retain_referenced(&mut table, vocab);

    if table.rows.is_empty() {
        return Ok(None);
    }
    table.kind = clean::classify(&table);
    if table.kind == TableKind::Context && !config.include_context {
        return Ok(None);
    }
    Ok(Some(table))
}

/// Convert an HTML file or URL to markdown.
///
/// # Errors
/// Returns `Err(Trial2MdError)` only when the page cannot be obtained:
/// - File not found / permission denied / not HTML
/// - Network failure or timeout for URLs
///
/// Table-level failures are reported through
/// [`ConversionOutput::failures`] instead.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Trial2MdError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let html = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let output = process_with_config(&html, config);

    info!(
        "Conversion complete: {} sections, {}/{} tables, {}ms",
        output.stats.sections_found,
        output.stats.tables_converted,
        output.stats.tables_found,
        output.stats.duration_ms
    );
    Ok(output)
}

/// Convert and write the markdown directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files. The
/// file is written even when some tables failed.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Trial2MdError> {
    let output = convert(input_str, config).await?;
    write_atomic(output_path.as_ref(), &output.markdown).await?;
    Ok(output)
}

/// Write `contents` to `path` via a sibling `.md.tmp` file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), Trial2MdError> {
    let write_err = |e: std::io::Error| Trial2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Trial2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Trial2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Report which sections and tables a page holds, without rendering.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<InspectReport, Trial2MdError> {
    let html = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    Ok(inspect_html(&html))
}

/// Pure counterpart of [`inspect`].
pub fn inspect_html(raw_html: &str) -> InspectReport {
    let page = parse::parse_page(raw_html);
    let sections = locate::locate_sections(&page.blocks)
        .into_iter()
        .map(|s| SectionSummary {
            kind: s.kind,
            heading: s.heading,
            tables: s.tables.len(),
        })
        .collect();
    let total_tables = page
        .blocks
        .iter()
        .filter(|b| matches!(b, Block::Table(_)))
        .count();

    InspectReport {
        trial_id: page.trial_id,
        title: page.title,
        sections,
        footnote_definitions: page.footnotes.len(),
        total_tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SectionKind;
    use crate::progress::ConversionProgressCallback;
    use std::sync::{Arc, Mutex};

    const PAGE: &str = r#"<html><head><title>Study of X</title></head><body>
        <p>NCT01234567</p>
        <h2>Adverse Events</h2>
        <table><tr><th>Event</th><th>Drug</th></tr>
               <tr><td>Nausea</td><td>4 a</td></tr></table>
        <h2>Outcome Results</h2>
        <table><tr><td>Description</td><td>Change in weight</td></tr>
               <tr><td>Time Frame</td><td>12 weeks</td></tr></table>
        <table><tr><th>Arm</th><th>Mean</th></tr>
               <tr><td>Drug</td><td>12.3 b</td></tr></table>
        <ul class="footnotes"><li>a. Mild</li><li>b. p&lt;0.05</li><li>c. unused</li></ul>
    </body></html>"#;

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl ConversionProgressCallback for Events {
        fn on_conversion_start(&self, total: usize) {
            self.0.lock().unwrap().push(format!("start {total}"));
        }
        fn on_table_complete(&self, section: SectionKind, table: usize, rows: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("ok {section} {table} {rows}"));
        }
        fn on_table_error(&self, section: SectionKind, table: usize, _error: &str) {
            self.0.lock().unwrap().push(format!("err {section} {table}"));
        }
        fn on_conversion_complete(&self, total: usize, ok: usize) {
            self.0.lock().unwrap().push(format!("done {total} {ok}"));
        }
    }

    #[test]
    fn sections_are_reordered_and_footnotes_scoped() {
        let out = process_with_config(PAGE, &ConversionConfig::default());
        let kinds: Vec<SectionKind> = out.document.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, SectionKind::ALL.to_vec());

        let md = &out.markdown;
        let outcome = md.find("## Outcome Results").unwrap();
        let adverse = md.find("## Adverse Effects").unwrap();
        assert!(outcome < adverse);
        assert!(md.starts_with("# Study of X (NCT01234567)\n"));
        assert!(md.contains("**Description:** Change in weight"));
        assert!(md.contains("| Drug | 12.3 |\n\nb: p<0.05"));
        assert!(md.contains("| Nausea | 4 |\n\na: Mild"));
        assert!(!md.contains("unused"));
        assert_eq!(out.stats.footnotes_emitted, 2);
        assert_eq!(out.stats.tables_converted, 3);
    }

    #[test]
    fn context_tables_can_be_dropped() {
        let config = ConversionConfig::builder()
            .include_context(false)
            .build()
            .unwrap();
        let out = process_with_config(PAGE, &config);
        assert!(!out.markdown.contains("Change in weight"));
        assert_eq!(out.stats.tables_skipped, 1);
    }

    #[test]
    fn malformed_table_does_not_stop_siblings() {
        let html = r#"<h2>Outcome Results</h2>
            <table><tr><td>a</td><td rowspan="2">b</td></tr>
                   <tr><td colspan="2">c</td></tr></table>
            <table><tr><th>Arm</th></tr><tr><td>Placebo</td></tr></table>"#;
        let events = Arc::new(Events::default());
        let config = ConversionConfig::builder()
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let out = process_with_config(html, &config);

        assert_eq!(out.failures().len(), 1);
        assert_eq!(out.failures()[0].table(), 1);
        assert!(out.markdown.contains("| Placebo |"));
        assert!(out.markdown.contains("> Skipped Outcome Results, table 1"));
        assert_eq!(
            *events.0.lock().unwrap(),
            vec![
                "start 2",
                "err Outcome Results 1",
                "ok Outcome Results 2 2",
                "done 2 1"
            ]
        );
    }

    #[test]
    fn process_is_deterministic() {
        assert_eq!(process(PAGE), process(PAGE));
    }

    #[test]
    fn page_without_sections() {
        let md = process("<html><body><h1>Eligibility</h1><table><tr><td>x</td></tr></table></body></html>");
        assert_eq!(md, "# Eligibility\n");
        assert_eq!(process(""), format!("# {}\n", assemble::FALLBACK_HEADING));
    }

    #[test]
    fn inspect_counts_without_rendering() {
        let report = inspect_html(PAGE);
        assert_eq!(report.trial_id.as_deref(), Some("NCT01234567"));
        assert_eq!(report.total_tables, 3);
        assert_eq!(report.footnote_definitions, 3);
        assert_eq!(report.sections[0].kind, SectionKind::OutcomeResults);
        assert_eq!(report.sections[0].tables, 2);
        assert_eq!(report.sections[1].tables, 1);
    }

    #[tokio::test]
    async fn convert_to_file_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("NCT01234567.html");
        std::fs::write(&src, PAGE).unwrap();
        let dest = dir.path().join("out").join("NCT01234567.md");

        let out = convert_to_file(src.to_string_lossy(), &dest, &ConversionConfig::default())
            .await
            .unwrap();
        let written = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(written, out.markdown);
        assert!(!dest.with_extension("md.tmp").exists());
    }

    #[test]
    fn convert_sync_reports_missing_file() {
        let err = convert_sync("/no/such/page.html", &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, Trial2MdError::FileNotFound { .. }));
    }
}
