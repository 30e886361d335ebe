//! Document assembly: one [`TrialDocument`] → one markdown string.
//!
//! Pure and in-memory. The polish pass at the end is a handful of
//! deterministic string rules, so the same document always yields
//! byte-identical output.

use crate::config::ConversionConfig;
use crate::document::{Section, TrialDocument};
use crate::pipeline::markdown::render_table;
use once_cell::sync::Lazy;
use regex::Regex;

/// Top-level heading used when the page has neither title nor trial id.
pub const FALLBACK_HEADING: &str = "Clinical Trial Results";

/// Render the whole document.
pub fn assemble(doc: &TrialDocument, config: &ConversionConfig) -> String {
    let mut parts: Vec<String> = Vec::new();

    if config.include_metadata {
        parts.push(format_yaml_front_matter(doc));
    }
    parts.push(format!("# {}", document_heading(doc)));

    for section in &doc.sections {
        parts.push(render_section(section, config));
    }

    polish(&parts.join("\n\n"))
}

/// `Title (NCT…)`, whichever half is known, or the fallback.
pub fn document_heading(doc: &TrialDocument) -> String {
    let title = doc.title.trim();
    match (title.is_empty(), doc.trial_id.as_deref()) {
        (false, Some(id)) if !title.contains(id) => format!("{} ({})", title, id),
        (false, _) => title.to_string(),
        (true, Some(id)) => id.to_string(),
        (true, None) => FALLBACK_HEADING.to_string(),
    }
}

fn render_section(section: &Section, config: &ConversionConfig) -> String {
    let opts = config.markdown_options();
    let mut parts = vec![format!("## {}", section.kind.title())];

    let mut last_title: Option<&str> = None;
    for table in &section.tables {
        let rendered = render_table(table, &opts);
        if rendered.is_empty() {
            continue;
        }
        let title = table.title.as_deref();
        if title != last_title {
            if let Some(t) = title {
                parts.push(format!("### {}", t));
            }
            last_title = title;
        }
        parts.push(rendered);
    }

    for failure in &section.failures {
        parts.push(format!("> Skipped {}", failure));
    }

    parts.join("\n\n")
}

/// Format document metadata as YAML front matter.
fn format_yaml_front_matter(doc: &TrialDocument) -> String {
    let mut yaml = String::from("---\n");

    if !doc.title.is_empty() {
        yaml.push_str(&format!("title: {}\n", yaml_string(&doc.title)));
    }
    if let Some(ref id) = doc.trial_id {
        yaml.push_str(&format!("trial_id: {}\n", yaml_string(id)));
    }
    if doc.sections.is_empty() {
        yaml.push_str("sections: []\n");
    } else {
        yaml.push_str("sections:\n");
        for section in &doc.sections {
            yaml.push_str(&format!("  - {}\n", yaml_string(section.kind.title())));
        }
    }
    yaml.push_str(&format!("tables: {}\n", doc.table_count()));

    yaml.push_str("---");
    yaml
}

/// A JSON string literal is a valid double-quoted YAML scalar.
fn yaml_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.replace('"', "'")))
}

// ── Polish ───────────────────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Final cleanup: LF endings, no trailing whitespace, at most one blank
/// line in a row, exactly one final newline.
pub fn polish(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}
