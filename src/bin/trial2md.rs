//! CLI binary for trial2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use trial2md::pipeline::input::output_stem;
use trial2md::{
    convert, inspect, ConversionConfig, ConversionOutput, ConversionProgressCallback,
    InspectReport, ProgressCallback, SectionKind,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the page is fetched, then
/// one log line per table, failed tables named by section.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    /// Reset for the next input.
    fn begin(&self, input: &str) {
        self.bar.set_prefix("Reading");
        self.bar.set_message(input.to_string());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_tables: usize) {
        self.bar.set_prefix("Converting");
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("{total_tables} tables found"))));
    }

    fn on_table_complete(&self, section: SectionKind, table: usize, rows: usize) {
        self.bar.println(format!(
            "  {} {:<16} table {:>2}  {}",
            green("✓"),
            section.title(),
            table,
            dim(&format!("{rows} rows")),
        ));
    }

    fn on_table_error(&self, section: SectionKind, table: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<16} table {:>2}  {}",
            red("✗"),
            section.title(),
            table,
            red(&msg),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  trial2md NCT01234567.html

  # Convert to file
  trial2md NCT01234567.html -o NCT01234567.md

  # Convert from URL
  trial2md "https://clinicaltrials.gov/study/NCT01234567?tab=results" -o results.md

  # Several saved pages into a directory (one <stem>.md each)
  trial2md pages/*.html --output-dir markdown/

  # Which sections and tables does a page hold?
  trial2md --inspect-only NCT01234567.html

  # JSON output (markdown + structured document + stats)
  trial2md --json --metadata NCT01234567.html > output.json

  # Plain-text line breaks inside cells
  trial2md --line-break " / " NCT01234567.html

ENVIRONMENT VARIABLES:
  Every flag can also be set as TRIAL2MD_<FLAG>, e.g. TRIAL2MD_LINE_BREAK.
  RUST_LOG overrides the log filter (e.g. RUST_LOG=trial2md=debug).
"#;

/// Convert clinical-trial result tables in HTML pages to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "trial2md",
    version,
    about = "Convert clinical-trial result tables in HTML pages to Markdown",
    long_about = "Convert the Outcome Results and Adverse Effects tables of clinical-trial \
pages (local HTML files or URLs) to clean, deterministic Markdown. Merged cells are expanded, \
footnote markers are moved into a footnote block under each table, and repeated header rows \
are removed.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file paths or HTTP/HTTPS URLs, processed in order.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Write Markdown to this file instead of stdout (single input only).
    #[arg(short, long, env = "TRIAL2MD_OUTPUT", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write one `<stem>.md` per input into this directory.
    #[arg(long, env = "TRIAL2MD_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Output structured JSON (ConversionOutput) instead of Markdown.
    #[arg(long, env = "TRIAL2MD_JSON")]
    json: bool,

    /// Prepend YAML front-matter with title, trial id and sections.
    #[arg(long, env = "TRIAL2MD_METADATA")]
    metadata: bool,

    /// Marker used for line breaks inside table cells.
    #[arg(long, env = "TRIAL2MD_LINE_BREAK", default_value = "<br>")]
    line_break: String,

    /// Do not print footnotes under tables.
    #[arg(long, env = "TRIAL2MD_NO_FOOTNOTES")]
    no_footnotes: bool,

    /// Drop label/value context tables (Description, Time Frame, …).
    #[arg(long, env = "TRIAL2MD_NO_CONTEXT")]
    no_context: bool,

    /// Print the sections and table counts only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// HTTP fetch timeout in seconds.
    #[arg(long, env = "TRIAL2MD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress output.
    #[arg(long, env = "TRIAL2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TRIAL2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TRIAL2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress lines already say what the INFO logs would.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.output.is_some() && cli.inputs.len() > 1 {
        bail!("--output takes a single input; use --output-dir for several");
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let mut reports = Vec::with_capacity(cli.inputs.len());
        for input in &cli.inputs {
            let report = inspect(input, &config)
                .await
                .with_context(|| format!("Failed to inspect {input}"))?;
            reports.push((input.as_str(), report));
        }
        if cli.json {
            let only: Vec<&InspectReport> = reports.iter().map(|(_, r)| r).collect();
            let json = if only.len() == 1 {
                serde_json::to_string_pretty(only[0])
            } else {
                serde_json::to_string_pretty(&only)
            }
            .context("Failed to serialize report")?;
            println!("{json}");
        } else {
            for (input, report) in &reports {
                print_report(input, report);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )?;

    if let Some(ref dir) = cli.output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    // ── Run conversions ──────────────────────────────────────────────────
    let mut outputs: Vec<ConversionOutput> = Vec::with_capacity(cli.inputs.len());
    let mut fatal = 0usize;

    for input in &cli.inputs {
        if let Some(ref cb) = progress {
            cb.begin(input);
        }
        let output = match convert(input, &config).await {
            Ok(output) => output,
            Err(e) => {
                fatal += 1;
                if let Some(ref cb) = progress {
                    cb.bar.suspend(|| eprintln!("{} {input}: {e}", red("✘")));
                } else {
                    eprintln!("{} {input}: {e}", red("✘"));
                }
                continue;
            }
        };

        let destination = match (&cli.output, &cli.output_dir) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(dir)) => {
                let ext = if cli.json { "json" } else { "md" };
                Some(dir.join(format!("{}.{}", output_stem(input), ext)))
            }
            (None, None) => None,
        };

        if let Some(path) = destination {
            write_output(&path, &output, cli.json).await?;
            if !cli.quiet {
                report_written(input, &path, &output);
            }
        } else {
            if !cli.quiet && !show_progress {
                report_failures(input, &output);
            }
            outputs.push(output);
        }
    }

    if let Some(ref cb) = progress {
        cb.finish();
        if !cli.quiet && cb.errors.load(Ordering::SeqCst) > 0 {
            eprintln!(
                "{} {} tables could not be converted; the rest was written",
                cyan("⚠"),
                cb.errors.load(Ordering::SeqCst)
            );
        }
    }

    // ── Stdout ───────────────────────────────────────────────────────────
    if !outputs.is_empty() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if cli.json {
            let json = if outputs.len() == 1 {
                serde_json::to_string_pretty(&outputs[0])
            } else {
                serde_json::to_string_pretty(&outputs)
            }
            .context("Failed to serialise output")?;
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        } else {
            let joined = outputs
                .iter()
                .map(|o| o.markdown.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            handle
                .write_all(joined.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    if fatal > 0 {
        bail!("{fatal} of {} inputs could not be converted", cli.inputs.len());
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .line_break_marker(cli.line_break.clone())
        .include_footnotes(!cli.no_footnotes)
        .include_context(!cli.no_context)
        .include_metadata(cli.metadata)
        .download_timeout_secs(cli.download_timeout);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

async fn write_output(path: &Path, output: &ConversionOutput, json: bool) -> Result<()> {
    let contents = if json {
        serde_json::to_string_pretty(output).context("Failed to serialise output")?
    } else {
        output.markdown.clone()
    };
    trial2md::convert::write_atomic(path, &contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn report_written(input: &str, path: &Path, output: &ConversionOutput) {
    let stats = &output.stats;
    eprintln!(
        "{}  {}  {}/{} tables  {}ms  →  {}",
        if stats.tables_failed == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        input,
        stats.tables_converted,
        stats.tables_found,
        stats.duration_ms,
        bold(&path.display().to_string()),
    );
    for failure in output.failures() {
        eprintln!("   {} {}", red("✗"), failure);
    }
}

fn report_failures(input: &str, output: &ConversionOutput) {
    let stats = &output.stats;
    eprintln!(
        "Converted {}/{} tables from {} in {}ms",
        stats.tables_converted, stats.tables_found, input, stats.duration_ms
    );
    for failure in output.failures() {
        eprintln!("  failed: {}", failure);
    }
}

fn print_report(input: &str, report: &InspectReport) {
    println!("Input:        {}", input);
    if let Some(ref t) = report.title {
        println!("Title:        {}", t);
    }
    if let Some(ref id) = report.trial_id {
        println!("Trial ID:     {}", id);
    }
    println!("Tables:       {}", report.total_tables);
    println!("Footnotes:    {}", report.footnote_definitions);
    if report.sections.is_empty() {
        println!("Sections:     {}", dim("none"));
    }
    for section in &report.sections {
        println!(
            "Section:      {} ({} tables, heading \"{}\")",
            section.kind, section.tables, section.heading
        );
    }
}
