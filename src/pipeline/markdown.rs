//! Markdown rendering for a single normalised table.
//!
//! The first row is the header row. Cell text is escaped so a literal `|`
//! cannot open a new column, and line breaks become the configured marker
//! because a raw newline would end the table row.

use crate::config::MarkdownOptions;
use crate::document::{Footnote, Table, TableKind};
use crate::pipeline::clean;

/// Render one table, its caption and its footnotes.
///
/// Returns an empty string for a table with no columns. The result has no
/// trailing newline.
pub fn render_table(table: &Table, opts: &MarkdownOptions) -> String {
    if table.column_count == 0 || table.rows.is_empty() {
        return String::new();
    }

    let mut blocks: Vec<String> = Vec::new();
    if let Some(caption) = &table.caption {
        blocks.push(format!("**{}**", inline(caption, opts)));
    }

    let body = match table.kind {
        TableKind::Data => render_grid(table, opts),
        TableKind::Context => render_context(table, opts),
    };
    blocks.push(body);

    if opts.include_footnotes && !table.footnotes.is_empty() {
        blocks.push(render_footnotes(&table.footnotes));
    }

    blocks.join("\n\n")
}

/// Pipe grid. Cycle and period group rows split the grid into one table per
/// group, each under its own `####` heading and repeating the header row.
fn render_grid(table: &Table, opts: &MarkdownOptions) -> String {
    let Some((header, body)) = table.rows.split_first() else {
        return String::new();
    };
    let head = format!(
        "{}\n|{}",
        row_line(header.iter().map(|c| c.text.as_str()), opts),
        " --- |".repeat(table.column_count)
    );

    let mut blocks: Vec<String> = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut grouped = false;
    for row in body {
        if let Some(label) = clean::period_label(row) {
            if !lines.is_empty() {
                blocks.push(format!("{}\n{}", head, std::mem::take(&mut lines).join("\n")));
            }
            blocks.push(format!("#### {}", inline(label, opts)));
            grouped = true;
        } else {
            lines.push(row_line(row.iter().map(|c| c.text.as_str()), opts));
        }
    }

    if !lines.is_empty() {
        blocks.push(format!("{}\n{}", head, lines.join("\n")));
    } else if !grouped {
        blocks.push(head);
    }
    blocks.join("\n\n")
}

fn row_line<'a>(cells: impl Iterator<Item = &'a str>, opts: &MarkdownOptions) -> String {
    let cells: Vec<String> = cells.map(|text| escape_cell(text, opts)).collect();
    format!("| {} |", cells.join(" | "))
}

/// `**Label:** value` lines for key/value context tables.
fn render_context(table: &Table, opts: &MarkdownOptions) -> String {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let label = row.first()?.text.trim_end_matches(':').trim();
            let value = row.get(1).map(|c| c.text.as_str()).unwrap_or("");
            Some(format!("**{}:** {}", inline(label, opts), inline(value, opts)))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_footnotes(footnotes: &[Footnote]) -> String {
    footnotes
        .iter()
        .map(|f| format!("{}: {}", f.marker, f.text.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Escape a cell for use between table pipes.
pub fn escape_cell(text: &str, opts: &MarkdownOptions) -> String {
    inline(&text.replace('|', "\\|"), opts)
}

fn inline(text: &str, opts: &MarkdownOptions) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(&opts.line_break_marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Footnote;

    fn opts() -> MarkdownOptions {
        MarkdownOptions::default()
    }

    #[test]
    fn renders_header_separator_and_rows() {
        let t = Table::from_rows(vec![vec!["Arm", "N"], vec!["Placebo", "12"]]);
        assert_eq!(
            render_table(&t, &opts()),
            "| Arm | N |\n| --- | --- |\n| Placebo | 12 |"
        );
    }

    #[test]
    fn pipes_are_escaped() {
        let t = Table::from_rows(vec![vec!["Group"], vec!["A | B"]]);
        let md = render_table(&t, &opts());
        assert!(md.contains("| A \\| B |"), "got: {md}");
        let data_line = md.lines().last().unwrap_or_default();
        assert_eq!(data_line.matches(" | ").count(), 0);
    }

    #[test]
    fn line_breaks_use_marker() {
        let t = Table::from_rows(vec![vec!["x"], vec!["one\ntwo"]]);
        assert!(render_table(&t, &opts()).ends_with("| one<br>two |"));

        let custom = MarkdownOptions {
            line_break_marker: " / ".into(),
            include_footnotes: true,
        };
        assert!(render_table(&t, &custom).ends_with("| one / two |"));
    }

    #[test]
    fn footnotes_follow_the_table() {
        let mut t = Table::from_rows(vec![vec!["Mean"], vec!["12.3"]]);
        t.footnotes = vec![Footnote::new("a", "p<0.05"), Footnote::new("*", "LOCF")];
        let md = render_table(&t, &opts());
        assert!(md.ends_with("| 12.3 |\n\na: p<0.05\n\n*: LOCF"), "got: {md}");

        let quiet = MarkdownOptions {
            include_footnotes: false,
            ..opts()
        };
        assert!(!render_table(&t, &quiet).contains("p<0.05"));
    }

    #[test]
    fn period_rows_become_headings_over_split_tables() {
        let t = Table::from_rows(vec![
            vec!["Event", "Arm A", "Arm B"],
            vec!["Cycle 1", "Cycle 1", "Cycle 1"],
            vec!["Nausea", "3", "1"],
            vec!["Cycle 2", "", ""],
            vec!["Nausea", "2", "0"],
            vec!["Rash", "1", "1"],
        ]);
        assert_eq!(
            render_table(&t, &opts()),
            "#### Cycle 1\n\n\
             | Event | Arm A | Arm B |\n| --- | --- | --- |\n| Nausea | 3 | 1 |\n\n\
             #### Cycle 2\n\n\
             | Event | Arm A | Arm B |\n| --- | --- | --- |\n| Nausea | 2 | 0 |\n| Rash | 1 | 1 |"
        );
    }

    #[test]
    fn rows_before_the_first_period_keep_their_own_table() {
        let t = Table::from_rows(vec![
            vec!["Event", "N"],
            vec!["Overall", "9"],
            vec!["Period 2", ""],
        ]);
        assert_eq!(
            render_table(&t, &opts()),
            "| Event | N |\n| --- | --- |\n| Overall | 9 |\n\n#### Period 2"
        );
    }

    #[test]
    fn caption_is_bold_above_table() {
        let mut t = Table::from_rows(vec![vec!["x"]]);
        t.caption = Some("Baseline".into());
        assert!(render_table(&t, &opts()).starts_with("**Baseline**\n\n| x |"));
    }

    #[test]
    fn context_tables_render_as_prose() {
        let mut t = Table::from_rows(vec![
            vec!["Description", "Percentage of participants"],
            vec!["Time Frame:", "52 weeks"],
        ]);
        t.kind = TableKind::Context;
        assert_eq!(
            render_table(&t, &opts()),
            "**Description:** Percentage of participants\n\n**Time Frame:** 52 weeks"
        );
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(render_table(&Table::default(), &opts()), "");
    }
}
