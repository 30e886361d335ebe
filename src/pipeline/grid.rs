//! Grid normalisation: raw rows with `colspan`/`rowspan` → a rectangular
//! [`Table`].
//!
//! Markdown tables have no spans, so a spanning cell is replicated into
//! every slot it covers. Each replica keeps the `origin` of the source
//! cell so later stages can tell expanded copies apart from real cells.
//!
//! Rows that come up short are right-padded with empty cells. The only
//! structural failure is two spans claiming the same slot; everything
//! else is repaired silently.

use crate::config::GridLimits;
use crate::document::{Cell, ColumnGroup, SectionKind, Table};
use crate::error::TableError;
use crate::pipeline::parse::RawTable;
use tracing::debug;

/// Why a raw table could not be expanded.
///
/// Carries no location; the caller attaches section and table index via
/// [`GridFault::at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridFault {
    Malformed(String),
    TooLarge { detail: String, limit: usize },
}

impl GridFault {
    pub fn at(self, section: SectionKind, table: usize) -> TableError {
        let section = section.title().to_string();
        match self {
            GridFault::Malformed(detail) => TableError::MalformedStructure {
                section,
                table,
                detail,
            },
            GridFault::TooLarge { detail, limit } => TableError::TooLarge {
                section,
                table,
                detail,
                limit,
            },
        }
    }
}

/// Expand a raw table into a dense grid.
///
/// `rowspan="0"` runs to the last declared row, and no vertical span runs
/// past it. `column_count` is the widest row after expansion.
pub fn normalize(raw: &RawTable, limits: &GridLimits) -> Result<Table, GridFault> {
    let declared_rows = raw.rows.len();
    if declared_rows > limits.max_rows {
        return Err(GridFault::TooLarge {
            detail: format!("table has {} rows", declared_rows),
            limit: limits.max_rows,
        });
    }

    let mut slots: Vec<Vec<Option<Cell>>> = vec![Vec::new(); declared_rows];
    let mut groups: Vec<ColumnGroup> = Vec::new();
    let mut total_cells = 0usize;

    for (r, row) in raw.rows.iter().enumerate() {
        let mut col = 0usize;

        for cell in &row.cells {
            // Skip slots already claimed by vertical spans from above.
            while slots[r].get(col).is_some_and(Option::is_some) {
                col += 1;
            }

            let colspan = cell.colspan();
            let remaining = declared_rows - r;
            let rowspan = match cell.rowspan {
                Some(0) => remaining,
                Some(n) => n.min(remaining),
                None => 1,
            };

            let right_edge = col.saturating_add(colspan);
            if right_edge > limits.max_columns {
                return Err(GridFault::TooLarge {
                    detail: format!("row {} reaches column {}", r + 1, right_edge),
                    limit: limits.max_columns,
                });
            }

            total_cells = total_cells.saturating_add(colspan.saturating_mul(rowspan));
            if total_cells > limits.max_cells {
                return Err(GridFault::TooLarge {
                    detail: format!("spans expand to {} cells", total_cells),
                    limit: limits.max_cells,
                });
            }

            for target_row in r..r + rowspan {
                let line = &mut slots[target_row];
                if line.len() < right_edge {
                    line.resize(right_edge, None);
                }
                for target_col in col..right_edge {
                    if line[target_col].is_some() {
                        return Err(GridFault::Malformed(format!(
                            "overlapping spans at row {}, column {}",
                            target_row + 1,
                            target_col + 1
                        )));
                    }
                    line[target_col] = Some(Cell {
                        text: cell.text.clone(),
                        origin: (r, col),
                        markers: Vec::new(),
                        is_header: cell.is_header,
                    });
                }
            }

            if cell.is_header && colspan > 1 && !cell.text.trim().is_empty() {
                let group = ColumnGroup {
                    label: cell.text.clone(),
                    start: col,
                    end: right_edge,
                };
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }

            col = right_edge;
        }
    }

    let column_count = slots.iter().map(Vec::len).max().unwrap_or(0);
    if declared_rows.saturating_mul(column_count) > limits.max_cells {
        return Err(GridFault::TooLarge {
            detail: format!("grid is {} × {}", declared_rows, column_count),
            limit: limits.max_cells,
        });
    }

    let mut padded = 0usize;
    let rows: Vec<Vec<Cell>> = slots
        .into_iter()
        .enumerate()
        .map(|(r, mut line)| {
            line.resize(column_count, None);
            line.into_iter()
                .enumerate()
                .map(|(c, slot)| {
                    slot.unwrap_or_else(|| {
                        padded += 1;
                        Cell::new("", (r, c))
                    })
                })
                .collect()
        })
        .collect();

    if padded > 0 {
        debug!(
            "Padded {} empty cells into a {}-column grid",
            padded, column_count
        );
    }

    Ok(Table {
        rows,
        column_count,
        groups,
        caption: raw.caption.clone(),
        ..Table::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::{RawCell, RawRow};

    fn table(rows: Vec<RawRow>) -> RawTable {
        RawTable {
            caption: None,
            rows,
        }
    }

    fn cells(texts: &[&str]) -> Vec<RawCell> {
        texts.iter().map(|t| RawCell::new(*t)).collect()
    }

    #[test]
    fn rowspan_shifts_and_short_rows_are_padded() {
        // | A | B | C |
        // | A | D |      ← declared one cell short
        // | E | F | G |
        let raw = table(vec![
            RawRow::body(vec![
                RawCell::spanning("A", 2, 1),
                RawCell::new("B"),
                RawCell::new("C"),
            ]),
            RawRow::body(cells(&["D"])),
            RawRow::body(cells(&["E", "F", "G"])),
        ]);
        let t = normalize(&raw, &GridLimits::default()).unwrap();
        assert_eq!(t.column_count, 3);
        assert!(t.is_rectangular());
        assert_eq!(
            t.texts(),
            vec![vec!["A", "B", "C"], vec!["A", "D", ""], vec!["E", "F", "G"]]
        );
        assert_eq!(t.rows[1][0].origin, (0, 0));
        assert_eq!(t.rows[1][1].origin, (1, 1));
        assert_eq!(t.rows[1][2].origin, (1, 2));
    }

    #[test]
    fn colspan_is_replicated() {
        let raw = table(vec![
            RawRow::head(vec![RawCell::new(""), RawCell::spanning("Placebo", 1, 2)]),
            RawRow::body(cells(&["N", "10", "12"])),
        ]);
        let t = normalize(&raw, &GridLimits::default()).unwrap();
        assert_eq!(t.texts()[0], vec!["", "Placebo", "Placebo"]);
        assert_eq!(t.rows[0][2].origin, (0, 1));
        assert_eq!(
            t.groups,
            vec![ColumnGroup {
                label: "Placebo".into(),
                start: 1,
                end: 3
            }]
        );
    }

    #[test]
    fn rowspan_zero_runs_to_last_row() {
        let raw = table(vec![
            RawRow::body(vec![RawCell::spanning("Arm", 0, 1), RawCell::new("1")]),
            RawRow::body(cells(&["2"])),
            RawRow::body(cells(&["3"])),
        ]);
        let t = normalize(&raw, &GridLimits::default()).unwrap();
        assert_eq!(
            t.texts(),
            vec![vec!["Arm", "1"], vec!["Arm", "2"], vec!["Arm", "3"]]
        );
    }

    #[test]
    fn rowspan_is_clamped_to_declared_rows() {
        let raw = table(vec![
            RawRow::body(vec![RawCell::spanning("x", 50, 1), RawCell::new("y")]),
            RawRow::body(cells(&["z"])),
        ]);
        let t = normalize(&raw, &GridLimits::default()).unwrap();
        assert_eq!(t.rows.len(), 2);
    }

    #[test]
    fn zero_colspan_counts_as_one() {
        let raw = table(vec![RawRow::body(vec![
            RawCell {
                colspan: Some(0),
                ..RawCell::new("a")
            },
            RawCell::new("b"),
        ])]);
        let t = normalize(&raw, &GridLimits::default()).unwrap();
        assert_eq!(t.texts(), vec![vec!["a", "b"]]);
    }

    #[test]
    fn overlapping_spans_are_malformed() {
        // Row 0 puts a 2-row span at column 1; row 1 starts with a 2-column
        // span at column 0 that runs into it.
        let raw = table(vec![
            RawRow::body(vec![RawCell::new("a"), RawCell::spanning("b", 2, 1)]),
            RawRow::body(vec![RawCell::spanning("c", 1, 2)]),
        ]);
        let err = normalize(&raw, &GridLimits::default()).unwrap_err();
        assert!(matches!(err, GridFault::Malformed(ref d) if d.contains("row 2, column 2")));

        let table_err = err.at(SectionKind::AdverseEffects, 3);
        assert_eq!(table_err.section(), "Adverse Effects");
        assert_eq!(table_err.table(), 3);
    }

    #[test]
    fn width_limit_is_enforced() {
        let raw = table(vec![RawRow::body(vec![RawCell::spanning("wide", 1, 500)])]);
        let limits = GridLimits::default();
        let err = normalize(&raw, &limits).unwrap_err();
        assert!(matches!(err, GridFault::TooLarge { limit: 100, .. }));
    }

    #[test]
    fn row_limit_is_enforced() {
        let raw = table(vec![RawRow::body(cells(&["x"])); 3]);
        let limits = GridLimits {
            max_rows: 2,
            ..GridLimits::default()
        };
        assert!(matches!(
            normalize(&raw, &limits),
            Err(GridFault::TooLarge { limit: 2, .. })
        ));
    }

    #[test]
    fn empty_rows_become_padding() {
        let raw = table(vec![
            RawRow::body(cells(&["a", "b"])),
            RawRow::body(Vec::new()),
        ]);
        let t = normalize(&raw, &GridLimits::default()).unwrap();
        assert_eq!(t.texts(), vec![vec!["a", "b"], vec!["", ""]]);
    }

    #[test]
    fn caption_is_carried() {
        let raw = RawTable {
            caption: Some("Baseline".into()),
            rows: vec![RawRow::body(cells(&["x"]))],
        };
        let t = normalize(&raw, &GridLimits::default()).unwrap();
        assert_eq!(t.caption.as_deref(), Some("Baseline"));
    }
}
