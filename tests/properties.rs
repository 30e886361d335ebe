//! Property tests for the pure pipeline stages.
//!
//! Run with:
//!   cargo test --test properties

use proptest::prelude::*;
use trial2md::pipeline::clean::clean_table;
use trial2md::pipeline::footnotes::{resolve_text, MarkerVocabulary};
use trial2md::pipeline::grid::normalize;
use trial2md::pipeline::parse::{RawCell, RawRow, RawTable};
use trial2md::{process, Footnote, GridLimits, Table};

// ── Strategies ───────────────────────────────────────────────────────────────

/// Cell text drawn from the shapes that trip the cleaning rules.
fn cell_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(" \u{00A0} ".to_string()),
        Just("Arm".to_string()),
        Just("Placebo".to_string()),
        Just("Overall Study Overall Study".to_string()),
        Just("Period Title: Overall Study".to_string()),
        Just("12.5 12.5".to_string()),
        Just("one\n\n two".to_string()),
        "[a-z ]{0,12}",
    ]
}

fn text_table() -> impl Strategy<Value = Table> {
    (1usize..5)
        .prop_flat_map(|cols| {
            prop::collection::vec(prop::collection::vec(cell_text(), cols), 0..8)
        })
        .prop_map(|rows| {
            let mut table = Table::from_rows(rows);
            if let Some(first) = table.rows.first_mut() {
                for cell in first {
                    cell.is_header = true;
                }
            }
            table
        })
}

fn raw_cell() -> impl Strategy<Value = RawCell> {
    ("[a-z]{0,3}", 1usize..4, 0usize..4, any::<bool>()).prop_map(
        |(text, colspan, rowspan, is_header)| RawCell {
            is_header,
            ..RawCell::spanning(text, rowspan, colspan)
        },
    )
}

fn raw_table() -> impl Strategy<Value = RawTable> {
    prop::collection::vec(prop::collection::vec(raw_cell(), 0..5), 0..8).prop_map(|rows| {
        RawTable {
            caption: None,
            rows: rows.into_iter().map(RawRow::body).collect(),
        }
    })
}

fn vocabulary() -> MarkerVocabulary {
    MarkerVocabulary::new(&[
        Footnote::new("a", "first"),
        Footnote::new("*", "star"),
        Footnote::new("†", "dagger"),
        Footnote::new("1", "numbered"),
    ])
}

// ── Properties ───────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn clean_table_is_idempotent(table in text_table()) {
        let once = clean_table(table);
        let twice = clean_table(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn cleaned_rows_are_never_empty(table in text_table()) {
        let cleaned = clean_table(table);
        for row in &cleaned.rows {
            prop_assert!(row.iter().any(|c| !c.is_empty()));
        }
    }

    #[test]
    fn normalized_grids_are_rectangular(raw in raw_table()) {
        let limits = GridLimits::default();
        if let Ok(table) = normalize(&raw, &limits) {
            prop_assert!(table.is_rectangular());
            prop_assert_eq!(table.rows.len(), raw.rows.len());
            prop_assert!(table.column_count <= limits.max_columns);
            for group in &table.groups {
                prop_assert!(group.start < group.end && group.end <= table.column_count);
            }
        }
    }

    #[test]
    fn resolved_markers_are_defined(
        words in prop::collection::vec("[A-Za-z0-9.]{1,6}", 1..4),
        suffix in prop_oneof![
            Just(""), Just(" a"), Just("*"), Just(" †"), Just(" [1]"), Just(" a,*"), Just(" b"),
        ],
    ) {
        let vocab = vocabulary();
        let text = format!("{}{}", words.join(" "), suffix);
        let (visible, markers) = resolve_text(&text, &vocab);

        prop_assert!(!visible.is_empty());
        for m in &markers {
            prop_assert!(vocab.contains(m), "undefined marker {:?} from {:?}", m, text);
        }
        if markers.is_empty() {
            prop_assert_eq!(visible, text);
        }
    }

    #[test]
    fn table_footnotes_match_cell_markers(
        values in prop::collection::vec(prop_oneof![Just("4 a"), Just("5*"), Just("6"), Just("7 †")], 1..6),
    ) {
        let cells: String = values.iter().map(|v| format!("<td>{v}</td>")).collect();
        let html = format!(
            r#"<h2>Adverse Effects</h2>
               <table><tr><th>Event</th>{}</tr><tr><td>Rash</td>{}</tr></table>
               <ul class="footnotes"><li>a. first</li><li>* star</li><li>† dagger</li><li>b. unused</li></ul>"#,
            "<th>Arm</th>".repeat(values.len()),
            cells,
        );
        let out = trial2md::process_with_config(&html, &trial2md::ConversionConfig::default());
        for table in out.document.sections.iter().flat_map(|s| s.tables.iter()) {
            let referenced = table.referenced_markers();
            let listed: Vec<&str> = table.footnotes.iter().map(|f| f.marker.as_str()).collect();
            prop_assert_eq!(listed, referenced);
        }
        prop_assert!(!out.markdown.contains("unused"));
    }

    #[test]
    fn process_is_deterministic_and_total(body in "[<>a-z/ =\"\n]{0,200}") {
        let html = format!("<h2>Outcome Results</h2>{body}<table><tr><td>x</td></tr></table>");
        let first = process(&html);
        prop_assert!(first.starts_with("# "));
        prop_assert!(first.ends_with('\n'));
        prop_assert_eq!(process(&html), first);
    }
}
