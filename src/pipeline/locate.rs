//! Section location over the flattened block sequence.
//!
//! A section opens at a heading whose text contains one of the known
//! phrases and runs until the next heading of equal or higher level, a
//! nested heading naming the other section, or the end of the page. Nested
//! headings naming the same section ("Serious Adverse Events" under
//! "Adverse Events") title the tables below them. A page with no matching
//! heading yields no sections; that is a valid outcome.

use crate::document::SectionKind;
use crate::pipeline::parse::{Block, RawTable};

/// Case-insensitive phrases that open a section.
const VOCABULARY: &[(&str, SectionKind)] = &[
    ("outcome results", SectionKind::OutcomeResults),
    ("adverse effects", SectionKind::AdverseEffects),
    ("adverse events", SectionKind::AdverseEffects),
];

/// One located section and the raw tables inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedSection<'a> {
    pub kind: SectionKind,
    /// Text of the first heading that opened this section.
    pub heading: String,
    pub tables: Vec<LocatedTable<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTable<'a> {
    pub raw: &'a RawTable,
    /// Nearest sub-heading above the table inside the section.
    pub title: Option<String>,
}

/// Which section, if any, a heading text opens.
pub fn classify_heading(text: &str) -> Option<SectionKind> {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, kind)| *kind)
}

/// Split the page into sections, merged per kind and sorted by kind.
pub fn locate_sections(blocks: &[Block]) -> Vec<LocatedSection<'_>> {
    let mut found: Vec<LocatedSection<'_>> = Vec::new();
    let mut i = 0;

    while i < blocks.len() {
        let Block::Heading(heading) = &blocks[i] else {
            i += 1;
            continue;
        };
        let Some(kind) = classify_heading(&heading.text) else {
            i += 1;
            continue;
        };

        let mut tables = Vec::new();
        let mut title: Option<String> = None;
        let mut j = i + 1;
        while j < blocks.len() {
            match &blocks[j] {
                Block::Heading(sub) => {
                    if sub.level <= heading.level {
                        break;
                    }
                    // "Serious Adverse Events" under "Adverse Events" is a title.
                    match classify_heading(&sub.text) {
                        Some(other) if other != kind => break,
                        _ => title = Some(sub.text.clone()),
                    }
                }
                Block::Table(raw) => tables.push(LocatedTable {
                    raw,
                    title: title.clone(),
                }),
            }
            j += 1;
        }

        match found.iter_mut().find(|s| s.kind == kind) {
            Some(existing) => existing.tables.extend(tables),
            None => found.push(LocatedSection {
                kind,
                heading: heading.text.clone(),
                tables,
            }),
        }
        i = j;
    }

    found.sort_by_key(|s| s.kind);
    found
}
