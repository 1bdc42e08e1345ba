//! Shelf, layout grid, and placement types.
//!
//! A shelf's grid is a set of rows (non-overlapping horizontal bands of the
//! photo), each holding columns (non-overlapping vertical spans). Slots are
//! the materialized cross-product cells; all coordinates are normalized to
//! `[0, 1]` against the shelf photo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ColumnId, ItemId, PlacementId, RowId, ShelfId, SlotId, UserId};
use crate::item::ItemType;

/// A photographed shelf owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelf {
    pub id: ShelfId,
    pub owner_id: UserId,
    /// Unique per owner.
    pub name: String,
    pub description: String,
    /// Photo URL or data URI.
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A horizontal band of the shelf photo. Rows are 0-indexed top to bottom
/// and must not overlap in Y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfRow {
    pub id: RowId,
    pub shelf_id: ShelfId,
    pub row_index: u32,
    pub y_start: f64,
    pub y_end: f64,
}

/// A vertical span within one row. Columns are 0-indexed left to right and
/// must not overlap in X within their row. Different rows may carry
/// different column counts and boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfColumn {
    pub id: ColumnId,
    pub row_id: RowId,
    pub col_index: u32,
    pub x_start: f64,
    pub x_end: f64,
}

/// A materialized grid cell: the cross-product of a row and one of its
/// columns, carrying the full rectangle for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfSlot {
    pub id: SlotId,
    pub shelf_id: ShelfId,
    pub row_id: RowId,
    pub column_id: ColumnId,
    pub row_index: u32,
    pub col_index: u32,
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

/// An item's membership on a shelf. `slot_id = None` means the item belongs
/// to the shelf but is currently unplaced (e.g. its slot was removed by a
/// layout edit). At most one placement exists per (shelf, item) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: PlacementId,
    pub item_id: ItemId,
    pub shelf_id: ShelfId,
    pub slot_id: Option<SlotId>,
    pub created_at: DateTime<Utc>,
}

/// Compact item projection embedded in layout responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
    pub creator: String,
    pub item_type: ItemType,
    pub cover_image: String,
}

/// A placement joined with its item, as rendered by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedItem {
    pub placement_id: PlacementId,
    pub slot_id: Option<SlotId>,
    pub item: ItemSummary,
}

/// A placement whose slot was destroyed by a layout replacement. The
/// placement survives with a null slot until the owner reassigns or removes
/// the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacedItem {
    pub placement_id: PlacementId,
    pub item: ItemSummary,
}

/// The full render-ready view of a shelf: metadata, grid structure, current
/// placements, and items on the shelf without a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedShelf {
    pub shelf: Shelf,
    pub rows: Vec<ShelfRow>,
    pub columns: Vec<ShelfColumn>,
    pub slots: Vec<ShelfSlot>,
    pub placed: Vec<PlacedItem>,
    pub unplaced: Vec<PlacedItem>,
}

impl HydratedShelf {
    /// Find a slot by its grid position.
    pub fn slot_at(&self, row_index: u32, col_index: u32) -> Option<&ShelfSlot> {
        self.slots
            .iter()
            .find(|s| s.row_index == row_index && s.col_index == col_index)
    }
}

/// Listing projection for shelves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfSummary {
    pub id: ShelfId,
    pub name: String,
    pub description: String,
    pub photo: String,
    pub slot_count: u32,
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One cell of a proposed layout, as submitted by a client. The client
/// projects row-level y-bounds into each slot; row and column structure is
/// reconstructed server-side by grouping on `rowIndex` and
/// `(rowIndex, colIndex)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProposedSlot {
    /// Ignored by the reconciler: grid position is the identity, not the
    /// submitted id.
    #[serde(default)]
    pub slot_id: Option<SlotId>,
    pub row_index: u32,
    pub col_index: u32,
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

/// A validated proposed layout with row/column structure derived from the
/// flat slot list. Row indexes are dense `0..rows.len()`, column indexes
/// dense within each row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedGrid {
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub row_index: u32,
    /// Min/max over the row's proposed slots.
    pub y_start: f64,
    pub y_end: f64,
    pub columns: Vec<GridColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridColumn {
    pub col_index: u32,
    pub x_start: f64,
    pub x_end: f64,
}

impl ProposedGrid {
    pub fn slot_count(&self) -> usize {
        self.rows.iter().map(|r| r.columns.len()).sum()
    }

    /// Iterate all `(rowIndex, colIndex)` keys of the grid.
    pub fn keys(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.rows
            .iter()
            .flat_map(|r| r.columns.iter().map(move |c| (r.row_index, c.col_index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposed_slot_camel_case() {
        let json = r#"{"rowIndex":0,"colIndex":1,"xStart":0.5,"xEnd":0.9,"yStart":0.1,"yEnd":0.4}"#;
        let slot: ProposedSlot = serde_json::from_str(json).unwrap();
        assert_eq!(slot.row_index, 0);
        assert_eq!(slot.col_index, 1);
        assert!(slot.slot_id.is_none());
    }

    #[test]
    fn test_proposed_slot_rejects_unknown_fields() {
        let json = r#"{"rowIndex":0,"colIndex":0,"xStart":0,"xEnd":1,"yStart":0,"yEnd":1,"z":2}"#;
        assert!(serde_json::from_str::<ProposedSlot>(json).is_err());
    }

    #[test]
    fn test_grid_keys() {
        let grid = ProposedGrid {
            rows: vec![
                GridRow {
                    row_index: 0,
                    y_start: 0.0,
                    y_end: 0.5,
                    columns: vec![
                        GridColumn {
                            col_index: 0,
                            x_start: 0.0,
                            x_end: 0.5,
                        },
                        GridColumn {
                            col_index: 1,
                            x_start: 0.5,
                            x_end: 1.0,
                        },
                    ],
                },
                GridRow {
                    row_index: 1,
                    y_start: 0.5,
                    y_end: 1.0,
                    columns: vec![GridColumn {
                        col_index: 0,
                        x_start: 0.0,
                        x_end: 1.0,
                    }],
                },
            ],
        };
        let keys: Vec<_> = grid.keys().collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (1, 0)]);
        assert_eq!(grid.slot_count(), 3);
    }
}
