//! Geometric validation and grid derivation for proposed layouts.
//!
//! Clients submit a flat list of cells; rows and columns are reconstructed
//! by grouping on `rowIndex` and `(rowIndex, colIndex)`. Indexes must be
//! contiguous from zero (sparse proposals are rejected rather than
//! densified), coordinates must be normalized with positive extent, columns
//! must not overlap within a row, and derived row bands must not overlap
//! within the shelf.

use std::collections::BTreeMap;

use anthology_common::shelf::{GridColumn, GridRow, ProposedGrid, ProposedSlot};
use anthology_common::{Error, Result};

/// Validate a proposal and derive its grid structure.
pub fn derive_grid(proposed: &[ProposedSlot]) -> Result<ProposedGrid> {
    if proposed.is_empty() {
        return Err(Error::validation("a layout needs at least one slot"));
    }

    for slot in proposed {
        check_range("x", slot.row_index, slot.col_index, slot.x_start, slot.x_end)?;
        check_range("y", slot.row_index, slot.col_index, slot.y_start, slot.y_end)?;
    }

    // Group cells by row index.
    let mut by_row: BTreeMap<u32, Vec<&ProposedSlot>> = BTreeMap::new();
    for slot in proposed {
        by_row.entry(slot.row_index).or_default().push(slot);
    }

    // Row indexes must be dense 0..R-1.
    for (expected, (&actual, _)) in by_row.iter().enumerate() {
        if actual as usize != expected {
            return Err(Error::validation(format!(
                "row indexes must be contiguous from 0; missing row {expected}"
            )));
        }
    }

    let mut rows = Vec::with_capacity(by_row.len());
    for (&row_index, cells) in &by_row {
        let mut columns: BTreeMap<u32, GridColumn> = BTreeMap::new();
        for cell in cells {
            if columns
                .insert(
                    cell.col_index,
                    GridColumn {
                        col_index: cell.col_index,
                        x_start: cell.x_start,
                        x_end: cell.x_end,
                    },
                )
                .is_some()
            {
                return Err(Error::validation(format!(
                    "duplicate cell at row {row_index}, column {}",
                    cell.col_index
                )));
            }
        }
        for (expected, (&actual, _)) in columns.iter().enumerate() {
            if actual as usize != expected {
                return Err(Error::validation(format!(
                    "column indexes in row {row_index} must be contiguous from 0; \
                     missing column {expected}"
                )));
            }
        }

        // Columns must not overlap in X within the row.
        let mut spans: Vec<&GridColumn> = columns.values().collect();
        spans.sort_by(|a, b| a.x_start.total_cmp(&b.x_start));
        for pair in spans.windows(2) {
            if pair[1].x_start < pair[0].x_end {
                return Err(Error::validation(format!(
                    "columns {} and {} overlap in row {row_index}",
                    pair[0].col_index, pair[1].col_index
                )));
            }
        }

        // The row's y extent spans its cells; each persisted slot is
        // canonicalized to that extent.
        let y_start = cells.iter().map(|c| c.y_start).fold(f64::INFINITY, f64::min);
        let y_end = cells.iter().map(|c| c.y_end).fold(f64::NEG_INFINITY, f64::max);
        rows.push(GridRow {
            row_index,
            y_start,
            y_end,
            columns: columns.into_values().collect(),
        });
    }

    // Rows must not overlap in Y across the shelf.
    let mut by_y: Vec<&GridRow> = rows.iter().collect();
    by_y.sort_by(|a, b| a.y_start.total_cmp(&b.y_start));
    for pair in by_y.windows(2) {
        if pair[1].y_start < pair[0].y_end {
            return Err(Error::validation(format!(
                "rows {} and {} overlap vertically",
                pair[0].row_index, pair[1].row_index
            )));
        }
    }

    Ok(ProposedGrid { rows })
}

fn check_range(axis: &str, row: u32, col: u32, start: f64, end: f64) -> Result<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(Error::validation(format!(
            "slot ({row}, {col}) has a non-finite {axis} coordinate"
        )));
    }
    if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&end) {
        return Err(Error::validation(format!(
            "slot ({row}, {col}) {axis} range [{start}, {end}] must lie within [0, 1]"
        )));
    }
    if start >= end {
        return Err(Error::validation(format!(
            "slot ({row}, {col}) {axis}Start {start} must be less than {axis}End {end}"
        )));
    }
    Ok(())
}
