//! Page parsing: raw HTML → a flat, typed [`ParsedPage`].
//!
//! Later stages never touch the DOM. Everything they need is lifted here
//! into plain structs with explicit optional fields: heading levels, span
//! counts, row groups, and the page-wide footnote definitions.
//!
//! ## Flattening
//!
//! The document is walked in order and reduced to a sequence of
//! [`Block`]s (headings and tables). Section bounds are then a matter of
//! index ranges over that sequence, regardless of how deeply the source
//! page nests its cards and wrappers. The walker does not descend into a
//! table; content of a table nested in a cell stays in that cell's text.

use crate::document::Footnote;
use crate::pipeline::clean::{flatten_whitespace, normalize_whitespace};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

/// A parsed page, ready for section location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub trial_id: Option<String>,
    pub blocks: Vec<Block>,
    /// Footnote definitions in document order, one per marker.
    pub footnotes: Vec<Footnote>,
}

/// A structural element of the page, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(Heading),
    Table(RawTable),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 (most important) to 6.
    pub level: u8,
    pub text: String,
}

/// Which table section a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowGroup {
    Head,
    #[default]
    Body,
    Foot,
}

/// A table exactly as declared in the markup, before span expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub caption: Option<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub cells: Vec<RawCell>,
    pub group: RowGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCell {
    pub text: String,
    /// `colspan` attribute, `None` when absent or unparsable.
    pub colspan: Option<usize>,
    /// `rowspan` attribute, `None` when absent or unparsable. `Some(0)`
    /// means "to the end of the table".
    pub rowspan: Option<usize>,
    pub is_header: bool,
}

impl RawCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn spanning(text: impl Into<String>, rowspan: usize, colspan: usize) -> Self {
        Self {
            text: text.into(),
            colspan: Some(colspan),
            rowspan: Some(rowspan),
            is_header: false,
        }
    }

    /// Horizontal span, never less than 1.
    pub fn colspan(&self) -> usize {
        self.colspan.filter(|&n| n > 0).unwrap_or(1)
    }
}

impl RawRow {
    pub fn body(cells: Vec<RawCell>) -> Self {
        Self {
            cells,
            group: RowGroup::Body,
        }
    }

    pub fn head(cells: Vec<RawCell>) -> Self {
        let cells = cells
            .into_iter()
            .map(|c| RawCell {
                is_header: true,
                ..c
            })
            .collect();
        Self {
            cells,
            group: RowGroup::Head,
        }
    }
}

// ── Static selectors and patterns ────────────────────────────────────────────

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

static FOOTNOTE_ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "[class*=footnote] li, [id*=footnote] li, li[id^=fn], \
         [class*=footnote] p, p[class*=footnote], div[class*=footnote] > div",
    )
    .unwrap()
});

static DL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("dl").unwrap());

static RE_TRIAL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNCT\d{8}\b").unwrap());

static RE_SITE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[|\-–]\s*ClinicalTrials\.gov\s*$").unwrap());

/// `[a] text`, `(a) text`, `a. text`, `*) text`, `† text`, `12: text`.
static RE_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^\s*(?:\[([^\]\s]{1,4})\]|\(([^)\s]{1,4})\)|([^\s\w]{1,3}|[A-Za-z]|\d{1,2})[.):]?)\s+(\S.*)$",
    )
    .unwrap()
});

/// Footnote rows inside tables always use the bracketed form.
static RE_BRACKETED_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*\[([^\]\s]{1,4})\]\s*(\S.*)$").unwrap());

// ── Entry point ──────────────────────────────────────────────────────────────

/// Parse raw HTML into the typed page model.
///
/// Never fails: html5ever recovers from any markup, and a page without
/// headings or tables simply yields no blocks.
pub fn parse_page(raw_html: &str) -> ParsedPage {
    let html = Html::parse_document(raw_html);
    let root = html.root_element();

    let mut blocks = Vec::new();
    let mut table_notes = Vec::new();
    walk(root, &mut blocks, &mut table_notes);

    let mut footnotes = Vec::new();
    for def in list_definitions(&html).into_iter().chain(table_notes) {
        push_definition(&mut footnotes, def);
    }

    let title = html
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| flatten_whitespace(&t.text().collect::<String>()))
        .map(|t| RE_SITE_SUFFIX.replace(&t, "").into_owned())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            blocks.iter().find_map(|b| match b {
                Block::Heading(h) if h.level == 1 => Some(h.text.clone()),
                _ => None,
            })
        });

    let trial_id = find_trial_id(&element_text(root))
        .or_else(|| find_trial_id(raw_html));

    debug!(
        "Parsed page: {} blocks, {} footnote definitions, trial id {:?}",
        blocks.len(),
        footnotes.len(),
        trial_id
    );

    ParsedPage {
        title,
        trial_id,
        blocks,
        footnotes,
    }
}

/// First `NCT` + 8 digits registry identifier in `text`.
pub fn find_trial_id(text: &str) -> Option<String> {
    RE_TRIAL_ID.find(text).map(|m| m.as_str().to_string())
}

// ── Document walk ────────────────────────────────────────────────────────────

fn walk(el: ElementRef<'_>, blocks: &mut Vec<Block>, table_notes: &mut Vec<Footnote>) {
    for child in el.children().filter_map(ElementRef::wrap) {
        if let Some(level) = heading_level(child) {
            let text = flatten_whitespace(&element_text(child));
            if !text.is_empty() {
                blocks.push(Block::Heading(Heading { level, text }));
            }
            continue;
        }
        match child.value().name() {
            "table" => {
                let (table, notes) = read_table(child);
                table_notes.extend(notes);
                if !table.rows.is_empty() {
                    blocks.push(Block::Table(table));
                }
            }
            "script" | "style" | "template" | "noscript" | "head" => {}
            _ => walk(child, blocks, table_notes),
        }
    }
}

/// Heading level of `el`, if it is a heading.
fn heading_level(el: ElementRef<'_>) -> Option<u8> {
    let v = el.value();
    match v.name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ if v.attr("role") == Some("heading") => Some(
            v.attr("aria-level")
                .and_then(|l| l.trim().parse::<u8>().ok())
                .unwrap_or(2)
                .clamp(1, 6),
        ),
        _ => None,
    }
}

/// Visible text of an element, keeping line structure.
///
/// `<br>` and block-level children become newlines; `<sup>` content is
/// padded with spaces so superscript footnote markers become standalone
/// tokens (`12.3<sup>a</sup>` → `12.3 a`).
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                match e.name() {
                    "br" => out.push('\n'),
                    "script" | "style" | "template" => {}
                    "sup" => {
                        out.push(' ');
                        collect_text(child_el, out);
                        out.push(' ');
                    }
                    "p" | "div" | "li" | "ul" | "ol" | "tr" | "table" | "dd" | "dt" => {
                        out.push('\n');
                        collect_text(child_el, out);
                        out.push('\n');
                    }
                    "td" | "th" => {
                        out.push(' ');
                        collect_text(child_el, out);
                        out.push(' ');
                    }
                    _ => collect_text(child_el, out),
                }
            }
            _ => {}
        }
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

/// Read a `<table>` into its raw rows, diverting footnote rows.
fn read_table(table: ElementRef<'_>) -> (RawTable, Vec<Footnote>) {
    let mut raw = RawTable::default();
    collect_rows(table, RowGroup::Body, &mut raw);

    let mut notes = Vec::new();
    raw.rows.retain(|row| match footnote_row(row) {
        Some(note) => {
            notes.push(note);
            false
        }
        None => true,
    });
    (raw, notes)
}

fn collect_rows(el: ElementRef<'_>, group: RowGroup, raw: &mut RawTable) {
    for child in el.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => raw.rows.push(read_row(child, group)),
            "thead" => collect_rows(child, RowGroup::Head, raw),
            "tbody" => collect_rows(child, RowGroup::Body, raw),
            "tfoot" => collect_rows(child, RowGroup::Foot, raw),
            "caption" => {
                let text = flatten_whitespace(&element_text(child));
                if !text.is_empty() {
                    raw.caption = Some(text);
                }
            }
            // Rows of a nested table belong to that table.
            "table" => {}
            _ => collect_rows(child, group, raw),
        }
    }
}

fn read_row(tr: ElementRef<'_>, group: RowGroup) -> RawRow {
    let cells = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .map(|cell| {
            let v = cell.value();
            RawCell {
                text: normalize_whitespace(&element_text(cell)),
                colspan: span_attr(v.attr("colspan")),
                rowspan: span_attr(v.attr("rowspan")),
                is_header: v.name() == "th" || group == RowGroup::Head,
            }
        })
        .collect();
    RawRow { cells, group }
}

fn span_attr(value: Option<&str>) -> Option<usize> {
    value.and_then(|s| s.trim().parse::<usize>().ok())
}

/// A row carrying a single `[x] text` cell is a footnote definition.
fn footnote_row(row: &RawRow) -> Option<Footnote> {
    let (first, rest) = row.cells.split_first()?;
    if rest.iter().any(|c| !c.text.trim().is_empty()) {
        return None;
    }
    let caps = RE_BRACKETED_DEFINITION.captures(&first.text)?;
    Some(Footnote::new(&caps[1], flatten_whitespace(&caps[2])))
}

// ── Footnote definition lists ────────────────────────────────────────────────

fn list_definitions(html: &Html) -> Vec<Footnote> {
    let mut out = Vec::new();

    for item in html.select(&FOOTNOTE_ITEM_SELECTOR) {
        let text = flatten_whitespace(&element_text(item));
        if let Some(def) = parse_definition(&text) {
            out.push(def);
        } else if let Some(marker) = item
            .value()
            .attr("id")
            .and_then(|id| id.strip_prefix("fn"))
            .map(|m| m.trim_start_matches(['-', '_', ':']))
            .filter(|m| !m.is_empty() && m.len() <= 4)
        {
            if !text.is_empty() {
                out.push(Footnote::new(marker, text));
            }
        }
    }

    for dl in html.select(&DL_SELECTOR) {
        let scoped = in_note_container(dl);
        let mut pending: Option<String> = None;
        for child in dl.children().filter_map(ElementRef::wrap) {
            let text = flatten_whitespace(&element_text(child));
            match child.value().name() {
                "dt" => pending = Some(text),
                "dd" => {
                    if let Some(marker) = pending.take() {
                        let accepted = if scoped {
                            is_marker_like(&marker)
                        } else {
                            is_glyph_marker(&marker)
                        };
                        if accepted && !text.is_empty() {
                            out.push(Footnote::new(unbracket(&marker), text));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    out
}

/// Split `"a. p<0.05"`-style text into a definition.
pub fn parse_definition(text: &str) -> Option<Footnote> {
    let caps = RE_DEFINITION.captures(text)?;
    let marker = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str();
    Some(Footnote::new(marker, flatten_whitespace(&caps[4])))
}

/// `el` or one of its ancestors is a notes/footnotes container.
fn in_note_container(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| {
            let v = e.value();
            [v.attr("class"), v.attr("id")]
                .into_iter()
                .flatten()
                .any(|a| a.to_ascii_lowercase().contains("note"))
        })
}

/// A symbol (`†`, `**`) or bracketed (`[a]`) marker, never a plain word.
fn is_glyph_marker(s: &str) -> bool {
    let s = s.trim_end_matches([':', '.', ')']);
    let bracketed = s.len() > 2 && s.starts_with('[') && s.ends_with(']');
    let symbol = !s.is_empty() && !s.chars().any(char::is_alphanumeric);
    (bracketed || symbol) && is_marker_like(s)
}

/// `"[a]:"` → `"a"`.
fn unbracket(marker: &str) -> &str {
    let m = marker.trim_end_matches([':', '.', ')']);
    m.strip_prefix('[')
        .and_then(|m| m.strip_suffix(']'))
        .unwrap_or(m)
}

fn is_marker_like(s: &str) -> bool {
    let s = s.trim_end_matches([':', '.', ')']);
    !s.is_empty() && s.chars().count() <= 4 && !s.chars().any(char::is_whitespace)
}

fn push_definition(defs: &mut Vec<Footnote>, def: Footnote) {
    let marker = def.marker.trim_end_matches([':', '.', ')']).to_string();
    if marker.is_empty() || def.text.is_empty() || defs.iter().any(|d| d.marker == marker) {
        return;
    }
    defs.push(Footnote::new(marker, def.text));
}
