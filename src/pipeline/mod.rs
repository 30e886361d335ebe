//! Pipeline stages for trial-page-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step and can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ parse ──▶ locate ──▶ grid ──▶ footnotes ──▶ clean ──▶ markdown ──▶ assemble
//! (URL/path) (DOM)    (sections) (spans)  (markers)     (rows)    (tables)     (document)
//! ```
//!
//! 1. [`input`]     — read a local file or fetch a URL; the only stage with I/O
//! 2. [`parse`]     — flatten the DOM into typed headings and raw tables
//! 3. [`locate`]    — find the Outcome Results / Adverse Effects regions
//! 4. [`grid`]      — expand `rowspan`/`colspan` into a rectangular grid
//! 5. [`footnotes`] — strip known marker glyphs and attach their definitions
//! 6. [`clean`]     — whitespace, boilerplate and duplicate header rows
//! 7. [`markdown`]  — render one table with escaped cells
//! 8. [`assemble`]  — heading, sections, final polish

pub mod assemble;
pub mod clean;
pub mod footnotes;
pub mod grid;
pub mod input;
pub mod locate;
pub mod markdown;
pub mod parse;
