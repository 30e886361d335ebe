//! Data cleaning: deterministic text and row hygiene for normalised tables.
//!
//! Every rule here is a pure function, and the table-level pass is
//! idempotent: `clean_table(clean_table(t)) == clean_table(t)`. Text rules
//! run to a fixpoint, and the duplicate-row rule compares each row with the
//! last *kept* row, so a second pass finds nothing left to remove.
//!
//! ## Rules
//!
//! 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, word joiner)
//! 2. Whitespace runs with a line break → one `\n`; other runs → one space
//! 3. Drop the `Period Title:` label some pages prepend to group headers
//! 4. Collapse a phrase printed twice (`"Overall Study Overall Study"`)
//! 5. Remove rows that are empty after 1–4
//! 6. Remove a header row identical to the row kept just before it
//!
//! Classification (context tables, `Cycle`/`Period` group rows) does not
//! change the table; the renderer asks for it.

use crate::document::{Cell, Table, TableKind};
use once_cell::sync::Lazy;
use regex::Regex;

// ── Text rules ───────────────────────────────────────────────────────────────

static RE_BREAK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[\n\r\x{2028}\x{2029}]\s*").unwrap());

static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());

static RE_ANY_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static RE_PERIOD_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*period\s+title\s*:\s*").unwrap());

/// Shortest half that counts as a duplicated phrase.
///
/// Keeps `"10 10"` or `"NA NA"` intact.
const MIN_DUPLICATE_HALF: usize = 4;

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

fn remove_invisible_chars(input: &str) -> String {
    input.replace(INVISIBLE, "")
}

/// Normalise whitespace while keeping line structure.
///
/// Any run containing a line break becomes a single `\n`, any other run a
/// single space; the result is trimmed.
pub fn normalize_whitespace(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = RE_BREAK_RUN.replace_all(&s, "\n");
    let s = RE_SPACE_RUN.replace_all(&s, " ");
    s.trim().to_string()
}

/// Normalise whitespace onto a single line.
pub fn flatten_whitespace(input: &str) -> String {
    let s = remove_invisible_chars(input);
    RE_ANY_RUN.replace_all(&s, " ").trim().to_string()
}

fn strip_period_title(input: &str) -> String {
    RE_PERIOD_TITLE.replace(input, "").into_owned()
}

/// `"X X"`, `"X\nX"` or `"XX"` → `"X"` when `X` is a real phrase.
fn collapse_duplicate(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();
    if n < MIN_DUPLICATE_HALF * 2 {
        return input.to_string();
    }
    let half = n / 2;

    let (left, right) = if n % 2 == 1 && chars[half].is_whitespace() {
        (&chars[..half], &chars[half + 1..])
    } else if n % 2 == 0 {
        (&chars[..half], &chars[half..])
    } else {
        return input.to_string();
    };

    if left == right && left.iter().any(|c| c.is_alphabetic()) {
        left.iter().collect()
    } else {
        input.to_string()
    }
}

/// Apply every text rule until nothing changes.
pub fn clean_text(input: &str) -> String {
    let mut current = normalize_whitespace(input);
    loop {
        let next = normalize_whitespace(&collapse_duplicate(&strip_period_title(&current)));
        if next == current {
            return current;
        }
        current = next;
    }
}

// ── Table rules ──────────────────────────────────────────────────────────────

/// Clean every cell and drop empty and repeated header rows.
pub fn clean_table(mut table: Table) -> Table {
    for cell in table.rows.iter_mut().flatten() {
        cell.text = clean_text(&cell.text);
    }
    if let Some(title) = table.title.take() {
        table.title = Some(clean_text(&title)).filter(|t| !t.is_empty());
    }
    if let Some(caption) = table.caption.take() {
        table.caption = Some(clean_text(&caption)).filter(|t| !t.is_empty());
    }
    for group in &mut table.groups {
        group.label = clean_text(&group.label);
    }

    let rows = std::mem::take(&mut table.rows);
    let mut kept: Vec<Vec<_>> = Vec::with_capacity(rows.len());
    for row in rows {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        if let Some(prev) = kept.last() {
            let is_header = kept.len() == 1 || is_header_row(prev);
            if is_header && same_text(prev, &row) {
                continue;
            }
        }
        kept.push(row);
    }
    table.rows = kept;
    table
}

fn is_header_row(row: &[Cell]) -> bool {
    let mut filled = row.iter().filter(|c| !c.is_empty()).peekable();
    filled.peek().is_some() && filled.all(|c| c.is_header)
}

fn same_text(a: &[Cell], b: &[Cell]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.text == y.text)
}

// ── Classification ───────────────────────────────────────────────────────────

static RE_PERIOD_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:cycle|period)\b").unwrap());

/// Label of a cycle or period group row inside a result grid.
///
/// A group row names its cycle in the first cell and nothing else: the other
/// cells are empty or repeat the label because it spanned the whole row.
pub fn period_label(row: &[Cell]) -> Option<&str> {
    let (first, rest) = row.split_first()?;
    let label = first.text.as_str();
    let only_label = !rest.is_empty() && rest.iter().all(|c| c.is_empty() || c.text == label);
    (only_label && RE_PERIOD_LABEL.is_match(label)).then_some(label)
}

/// Row labels of the key/value tables printed around result grids.
const CONTEXT_LABELS: &[&str] = &[
    "description",
    "time frame",
    "analysis population description",
    "population description",
    "unit of measure",
    "measure type",
    "dispersion",
    "dispersion / precision",
    "units",
    "type of units analyzed",
    "adverse event reporting description",
    "additional description",
    "source vocabulary name",
    "assessment type",
    "frequency threshold",
    "outcome measure type",
];

/// Tell result grids apart from label/value context tables.
pub fn classify(table: &Table) -> TableKind {
    if table.column_count != 2 || table.rows.is_empty() {
        return TableKind::Data;
    }
    let all_context = table.rows.iter().all(|row| {
        let label = row[0].text.trim_end_matches(':').trim().to_lowercase();
        !row.iter().any(|c| c.is_header) && CONTEXT_LABELS.contains(&label.as_str())
    });
    if all_context {
        TableKind::Context
    } else {
        TableKind::Data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_table(rows: Vec<Vec<&str>>) -> Table {
        let mut t = Table::from_rows(rows);
        for cell in &mut t.rows[0] {
            cell.is_header = true;
        }
        t
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(normalize_whitespace("  a \t\u{00A0} b  "), "a b");
        assert_eq!(normalize_whitespace("one \n\n  two"), "one\ntwo");
        assert_eq!(normalize_whitespace("x\r\ny"), "x\ny");
        assert_eq!(flatten_whitespace("one \n two"), "one two");
    }

    #[test]
    fn invisible_chars_are_removed() {
        assert_eq!(normalize_whitespace("\u{FEFF}N\u{200B}=12"), "N=12");
    }

    #[test]
    fn period_title_prefix_and_duplicate_are_removed() {
        assert_eq!(
            clean_text("Period Title: Overall Study Overall Study"),
            "Overall Study"
        );
        assert_eq!(clean_text("Overall StudyOverall Study"), "Overall Study");
    }

    #[test]
    fn short_repeats_are_kept() {
        assert_eq!(clean_text("10 10"), "10 10");
        assert_eq!(clean_text("NA NA"), "NA NA");
        assert_eq!(clean_text("12.5 12.5"), "12.5 12.5");
    }

    #[test]
    fn clean_text_is_a_fixpoint() {
        let once = clean_text("Period Title: Period Title: Arm A Arm A");
        assert_eq!(once, "Arm A");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn empty_rows_are_dropped() {
        let t = clean_table(Table::from_rows(vec![
            vec!["a", "b"],
            vec![" ", "\u{200B}"],
            vec!["c", "d"],
        ]));
        assert_eq!(t.texts(), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn duplicate_header_row_is_removed_once() {
        let mut t = header_table(vec![
            vec!["Arm", "Placebo"],
            vec!["Arm", "Placebo"],
            vec!["N", "12"],
        ]);
        t.rows[1][0].is_header = true;
        t.rows[1][1].is_header = true;
        let t = clean_table(t);
        assert_eq!(t.texts(), vec![vec!["Arm", "Placebo"], vec!["N", "12"]]);
    }

    #[test]
    fn duplicate_of_first_row_is_removed_without_th() {
        let t = clean_table(Table::from_rows(vec![
            vec!["Arm", "Placebo"],
            vec!["Arm", "Placebo"],
            vec!["N", "12"],
        ]));
        assert_eq!(t.rows.len(), 2);
    }

    #[test]
    fn repeated_data_rows_are_kept() {
        let t = clean_table(header_table(vec![
            vec!["Event", "Count"],
            vec!["Nausea", "1"],
            vec!["Nausea", "1"],
        ]));
        assert_eq!(t.rows.len(), 3);
    }

    #[test]
    fn clean_table_is_idempotent() {
        let t = header_table(vec![
            vec!["Period Title: Arm A Arm A", " x "],
            vec!["Arm A", "x"],
            vec!["", ""],
            vec!["Arm A", "x"],
            vec!["1", "2"],
        ]);
        let once = clean_table(t);
        let twice = clean_table(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.texts(), vec![vec!["Arm A", "x"], vec!["1", "2"]]);
    }

    #[test]
    fn period_rows_are_recognised() {
        let t = Table::from_rows(vec![
            vec!["Cycle 1", "Cycle 1", "Cycle 1"],
            vec!["Period 2", "", ""],
            vec!["Cycle 1 Day 8", "4", "5"],
            vec!["Periodontal disease", "", ""],
            vec!["Recycle", "", ""],
        ]);
        assert_eq!(period_label(&t.rows[0]), Some("Cycle 1"));
        assert_eq!(period_label(&t.rows[1]), Some("Period 2"));
        assert_eq!(period_label(&t.rows[2]), None);
        assert_eq!(period_label(&t.rows[3]), None);
        assert_eq!(period_label(&t.rows[4]), None);

        let single = Table::from_rows(vec![vec!["Cycle 3"]]);
        assert_eq!(period_label(&single.rows[0]), None);
    }

    #[test]
    fn classify_context_tables() {
        let t = Table::from_rows(vec![
            vec!["Description", "Percentage of participants"],
            vec!["Time Frame:", "52 weeks"],
        ]);
        assert_eq!(classify(&t), TableKind::Context);

        let t = Table::from_rows(vec![vec!["Description", "x"], vec!["Nausea", "3"]]);
        assert_eq!(classify(&t), TableKind::Data);

        let mut t = Table::from_rows(vec![vec!["Time Frame", "52 weeks"]]);
        t.rows[0][0] = Cell::header("Time Frame", (0, 0));
        assert_eq!(classify(&t), TableKind::Data);
    }
}
