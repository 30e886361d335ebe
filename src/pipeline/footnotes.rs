//! Footnote resolution: inline marker glyphs → structured references.
//!
//! Marker glyphs differ from page to page (`a`, `*`, `†`, `[1]`), so the
//! matcher is built from the page's own definitions. [`MarkerVocabulary`] is
//! computed once per page and passed into [`resolve_table`] for every table.
//!
//! Only known markers are recognised. A glyph with no definition stays in the
//! cell as plain text, which keeps asterisks in `p*q` or a trailing `a` in
//! `"Grade a"` from being eaten when the page never defines them.

use crate::document::{Footnote, Table};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]\s]{1,4})\]").unwrap());

static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]{2,}").unwrap());

/// The set of marker ids defined on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerVocabulary {
    definitions: Vec<Footnote>,
}

impl MarkerVocabulary {
    /// Build from page definitions; the first definition of a marker wins.
    pub fn new(definitions: &[Footnote]) -> Self {
        let mut vocab = Self::default();
        for def in definitions {
            if !def.marker.is_empty() && vocab.get(&def.marker).is_none() {
                vocab.definitions.push(def.clone());
            }
        }
        vocab
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.get(marker).is_some()
    }

    pub fn get(&self, marker: &str) -> Option<&Footnote> {
        self.definitions.iter().find(|d| d.marker == marker)
    }

    /// Symbol markers (`*`, `†`, `**`) that may be glued to the preceding
    /// word, longest first.
    fn glyphs(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .definitions
            .iter()
            .map(|d| d.marker.as_str())
            .filter(|m| !m.chars().any(char::is_alphanumeric))
            .collect();
        out.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        out
    }

    /// `"a"` or `"a,b"` when every part is a known, bare-token marker.
    fn token_markers<'t>(&self, token: &'t str) -> Option<Vec<&'t str>> {
        let parts: Vec<&str> = token.split(',').filter(|p| !p.is_empty()).collect();
        let all_known = !parts.is_empty()
            && parts
                .iter()
                .all(|p| self.contains(p) && !p.chars().all(|c| c.is_ascii_digit()));
        all_known.then_some(parts)
    }
}

/// Strip known markers from one cell text.
///
/// Returns the visible text and the marker ids in reading order. Bare
/// numeric markers are only recognised in brackets (`[1]`), since a
/// trailing number is far more often data than a reference. Text is never
/// stripped to nothing: a cell that is only a marker is returned unchanged.
pub fn resolve_text(text: &str, vocab: &MarkerVocabulary) -> (String, Vec<String>) {
    if vocab.is_empty() || text.is_empty() {
        return (text.to_string(), Vec::new());
    }

    // Trailing tokens and glued glyphs, peeled right to left.
    let mut rest = text.trim_end();
    let mut trailing: Vec<Vec<&str>> = Vec::new();
    let glyphs = vocab.glyphs();
    loop {
        if let Some(split) = rest.rfind(char::is_whitespace) {
            let ws_len = rest[split..].chars().next().map_or(1, char::len_utf8);
            let token = &rest[split + ws_len..];
            let prefix = rest[..split].trim_end();
            if !prefix.is_empty() {
                if let Some(markers) = vocab.token_markers(token) {
                    trailing.push(markers);
                    rest = prefix;
                    continue;
                }
            }
        }
        if let Some(glyph) = glyphs
            .iter()
            .copied()
            .find(|g| rest.len() > g.len() && rest.ends_with(*g))
        {
            trailing.push(vec![glyph]);
            rest = rest[..rest.len() - glyph.len()].trim_end();
            continue;
        }
        break;
    }

    // Bracketed markers anywhere in what is left.
    let mut markers: Vec<String> = Vec::new();
    let stripped = RE_BRACKETED.replace_all(rest, |caps: &regex::Captures| {
        if vocab.contains(&caps[1]) {
            markers.push(caps[1].to_string());
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    let visible = RE_SPACE_RUN.replace_all(&stripped, " ").trim().to_string();

    for group in trailing.into_iter().rev() {
        markers.extend(group.into_iter().map(str::to_string));
    }

    if visible.is_empty() || markers.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let mut seen: Vec<String> = Vec::with_capacity(markers.len());
    for m in markers {
        if !seen.contains(&m) {
            seen.push(m);
        }
    }
    (visible, seen)
}

/// Resolve markers in every cell and attach the referenced footnotes.
pub fn resolve_table(table: &mut Table, vocab: &MarkerVocabulary) {
    if vocab.is_empty() {
        return;
    }
    for cell in table.rows.iter_mut().flatten() {
        let (text, markers) = resolve_text(&cell.text, vocab);
        cell.text = text;
        cell.markers = markers;
    }
    // The spanning header cell carries the reference; the label only loses the glyph.
    for group in &mut table.groups {
        group.label = resolve_text(&group.label, vocab).0;
    }
    retain_referenced(table, vocab);
}

/// Recompute `table.footnotes` from the markers its cells still carry.
///
/// Run again after cleaning, which may drop rows and with them the only
/// reference to a footnote.
pub fn retain_referenced(table: &mut Table, vocab: &MarkerVocabulary) {
    let referenced: Vec<Footnote> = table
        .referenced_markers()
        .into_iter()
        .filter_map(|m| vocab.get(m).cloned())
        .collect();
    table.footnotes = referenced;
}
