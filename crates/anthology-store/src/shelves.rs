//! Shelf persistence and the transactional layout reconciler.
//!
//! The reconciler's contract: grid position `(rowIndex, colIndex)` is the
//! identity of a cell, not its geometry. A replacement proposal is diffed
//! against the persisted layout; cells present on both sides keep their slot
//! ids (and therefore their placements) even when coordinates change, cells
//! only in the proposal get fresh ids, and cells only in the persisted
//! layout are destroyed. Placements of destroyed cells become unplaced,
//! never deleted.
//!
//! Write order inside the replacement transaction:
//! 1. verify shelf ownership, 2. upsert rows, 3. upsert columns, 4. upsert
//! slots, 5. null placements of removed slots, 6. delete removed slots,
//! then columns, then rows, 7. re-read the hydrated layout.

use std::collections::{HashMap, HashSet};

use anthology_common::shelf::{
    DisplacedItem, HydratedShelf, ItemSummary, PlacedItem, ProposedGrid, Shelf, ShelfColumn,
    ShelfRow, ShelfSlot, ShelfSummary,
};
use anthology_common::{
    ColumnId, Error, ItemId, ItemType, PlacementId, Result, RowId, ShelfId, SlotId, UserId,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::db::{is_unique_violation, parse_ts, parse_uuid, storage, ts};

pub fn create(
    conn: &mut Connection,
    owner: UserId,
    name: &str,
    description: &str,
    photo: &str,
    margin_x: f64,
    margin_y: f64,
    now: DateTime<Utc>,
) -> Result<HydratedShelf> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(storage)?;

    let shelf_id = ShelfId::new();
    tx.execute(
        "INSERT INTO shelves (id, owner_id, name, description, photo, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            shelf_id.to_string(),
            owner.to_string(),
            name,
            description,
            photo,
            ts(now),
            ts(now),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(format!("a shelf named {name:?} already exists"))
        } else {
            storage(e)
        }
    })?;

    // Scaffold: one row and one full-span column covering the photo interior.
    let (y_start, y_end) = (margin_y, 1.0 - margin_y);
    let (x_start, x_end) = (margin_x, 1.0 - margin_x);
    let row_id = RowId::new();
    tx.execute(
        "INSERT INTO shelf_rows (id, shelf_id, row_index, y_start, y_end) VALUES (?1, ?2, 0, ?3, ?4)",
        params![row_id.to_string(), shelf_id.to_string(), y_start, y_end],
    )
    .map_err(storage)?;
    let column_id = ColumnId::new();
    tx.execute(
        "INSERT INTO shelf_columns (id, row_id, col_index, x_start, x_end) VALUES (?1, ?2, 0, ?3, ?4)",
        params![column_id.to_string(), row_id.to_string(), x_start, x_end],
    )
    .map_err(storage)?;
    tx.execute(
        "INSERT INTO shelf_slots (id, shelf_id, row_id, column_id, row_index, col_index, \
         x_start, x_end, y_start, y_end) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, ?7, ?8)",
        params![
            SlotId::new().to_string(),
            shelf_id.to_string(),
            row_id.to_string(),
            column_id.to_string(),
            x_start,
            x_end,
            y_start,
            y_end,
        ],
    )
    .map_err(storage)?;

    let hydrated = hydrate(&tx, owner, shelf_id)?;
    tx.commit().map_err(storage)?;
    Ok(hydrated)
}

pub fn list(conn: &Connection, owner: UserId) -> Result<Vec<ShelfSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.name, s.description, s.photo, s.created_at, s.updated_at, \
             (SELECT COUNT(*) FROM shelf_slots sl WHERE sl.shelf_id = s.id), \
             (SELECT COUNT(*) FROM item_shelf_locations l WHERE l.shelf_id = s.id) \
             FROM shelves s WHERE s.owner_id = ?1 ORDER BY s.name COLLATE NOCASE",
        )
        .map_err(storage)?;
    let result = stmt
        .query_map([owner.to_string()], |row| {
            Ok(ShelfSummary {
                id: ShelfId(parse_uuid(0, &row.get::<_, String>(0)?)?),
                name: row.get(1)?,
                description: row.get(2)?,
                photo: row.get(3)?,
                created_at: parse_ts(4, &row.get::<_, String>(4)?)?,
                updated_at: parse_ts(5, &row.get::<_, String>(5)?)?,
                slot_count: row.get(6)?,
                item_count: row.get(7)?,
            })
        })
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage);
    result
}

pub fn get_hydrated(conn: &Connection, owner: UserId, shelf_id: ShelfId) -> Result<HydratedShelf> {
    hydrate(conn, owner, shelf_id)
}

/// Reconcile a validated proposed grid against the persisted layout and
/// return the new hydrated layout plus every placement displaced by the
/// call.
pub fn replace_layout(
    conn: &mut Connection,
    owner: UserId,
    shelf_id: ShelfId,
    grid: &ProposedGrid,
    now: DateTime<Utc>,
) -> Result<(HydratedShelf, Vec<DisplacedItem>)> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(storage)?;
    require_shelf(&tx, owner, shelf_id)?;

    let existing_rows = load_rows(&tx, shelf_id)?;
    let existing_columns = load_columns(&tx, shelf_id)?;
    let existing_slots = load_slot_ids(&tx, shelf_id)?;

    // Rows: kept rows keep their id and take the proposed bounds.
    let mut row_ids: HashMap<u32, RowId> = HashMap::new();
    for grow in &grid.rows {
        if let Some(old) = existing_rows.get(&grow.row_index) {
            tx.execute(
                "UPDATE shelf_rows SET y_start = ?1, y_end = ?2 WHERE id = ?3",
                params![grow.y_start, grow.y_end, old.id.to_string()],
            )
            .map_err(storage)?;
            row_ids.insert(grow.row_index, old.id);
        } else {
            let id = RowId::new();
            tx.execute(
                "INSERT INTO shelf_rows (id, shelf_id, row_index, y_start, y_end) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    shelf_id.to_string(),
                    grow.row_index,
                    grow.y_start,
                    grow.y_end,
                ],
            )
            .map_err(storage)?;
            row_ids.insert(grow.row_index, id);
        }
    }

    // Columns, keyed by (rowIndex, colIndex).
    let mut column_ids: HashMap<(u32, u32), ColumnId> = HashMap::new();
    for grow in &grid.rows {
        for gcol in &grow.columns {
            let key = (grow.row_index, gcol.col_index);
            if let Some(old) = existing_columns.get(&key) {
                tx.execute(
                    "UPDATE shelf_columns SET x_start = ?1, x_end = ?2 WHERE id = ?3",
                    params![gcol.x_start, gcol.x_end, old.id.to_string()],
                )
                .map_err(storage)?;
                column_ids.insert(key, old.id);
            } else {
                let id = ColumnId::new();
                tx.execute(
                    "INSERT INTO shelf_columns (id, row_id, col_index, x_start, x_end) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id.to_string(),
                        row_ids[&grow.row_index].to_string(),
                        gcol.col_index,
                        gcol.x_start,
                        gcol.x_end,
                    ],
                )
                .map_err(storage)?;
                column_ids.insert(key, id);
            }
        }
    }

    // Slots: kept cells reuse their slot id with refreshed geometry. Identity
    // is the grid position; coordinate changes never mint a new id.
    for grow in &grid.rows {
        for gcol in &grow.columns {
            let key = (grow.row_index, gcol.col_index);
            if let Some(slot_id) = existing_slots.get(&key) {
                tx.execute(
                    "UPDATE shelf_slots SET x_start = ?1, x_end = ?2, y_start = ?3, y_end = ?4 \
                     WHERE id = ?5",
                    params![gcol.x_start, gcol.x_end, grow.y_start, grow.y_end, slot_id.to_string()],
                )
                .map_err(storage)?;
            } else {
                tx.execute(
                    "INSERT INTO shelf_slots (id, shelf_id, row_id, column_id, row_index, \
                     col_index, x_start, x_end, y_start, y_end) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        SlotId::new().to_string(),
                        shelf_id.to_string(),
                        row_ids[&grow.row_index].to_string(),
                        column_ids[&key].to_string(),
                        grow.row_index,
                        gcol.col_index,
                        gcol.x_start,
                        gcol.x_end,
                        grow.y_start,
                        grow.y_end,
                    ],
                )
                .map_err(storage)?;
            }
        }
    }

    // Removed slots: unplace their items first, then drop the slot rows.
    let proposed: HashSet<(u32, u32)> = grid.keys().collect();
    let mut removed_keys: Vec<(u32, u32)> = existing_slots
        .keys()
        .filter(|key| !proposed.contains(key))
        .copied()
        .collect();
    removed_keys.sort_unstable();

    let mut displaced = Vec::new();
    for key in &removed_keys {
        let slot_id = existing_slots[key];
        displaced.extend(displaced_for_slot(&tx, slot_id)?);
        tx.execute(
            "UPDATE item_shelf_locations SET shelf_slot_id = NULL WHERE shelf_slot_id = ?1",
            [slot_id.to_string()],
        )
        .map_err(storage)?;
    }
    for key in &removed_keys {
        tx.execute(
            "DELETE FROM shelf_slots WHERE id = ?1",
            [existing_slots[key].to_string()],
        )
        .map_err(storage)?;
    }
    for (key, column) in &existing_columns {
        if !proposed.contains(key) {
            tx.execute(
                "DELETE FROM shelf_columns WHERE id = ?1",
                [column.id.to_string()],
            )
            .map_err(storage)?;
        }
    }
    let proposed_rows: HashSet<u32> = grid.rows.iter().map(|r| r.row_index).collect();
    for (row_index, row) in &existing_rows {
        if !proposed_rows.contains(row_index) {
            tx.execute("DELETE FROM shelf_rows WHERE id = ?1", [row.id.to_string()])
                .map_err(storage)?;
        }
    }

    tx.execute(
        "UPDATE shelves SET updated_at = ?1 WHERE id = ?2",
        params![ts(now), shelf_id.to_string()],
    )
    .map_err(storage)?;

    let hydrated = hydrate(&tx, owner, shelf_id)?;
    tx.commit().map_err(storage)?;

    tracing::debug!(
        shelf = %shelf_id,
        slots = hydrated.slots.len(),
        displaced = displaced.len(),
        "replaced shelf layout"
    );
    Ok((hydrated, displaced))
}

/// Place an item into a slot, moving it if it already sits elsewhere on the
/// shelf. A slot may hold any number of items.
pub fn assign_item(
    conn: &mut Connection,
    owner: UserId,
    shelf_id: ShelfId,
    slot_id: SlotId,
    item_id: ItemId,
    now: DateTime<Utc>,
) -> Result<HydratedShelf> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(storage)?;
    require_shelf(&tx, owner, shelf_id)?;

    let slot_exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM shelf_slots WHERE id = ?1 AND shelf_id = ?2",
            params![slot_id.to_string(), shelf_id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage)?;
    if slot_exists.is_none() {
        return Err(Error::not_found("slot"));
    }

    let item_exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM items WHERE id = ?1 AND owner_id = ?2",
            params![item_id.to_string(), owner.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage)?;
    if item_exists.is_none() {
        return Err(Error::not_found("item"));
    }

    tx.execute(
        "INSERT INTO item_shelf_locations (id, item_id, shelf_id, shelf_slot_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (shelf_id, item_id) DO UPDATE SET shelf_slot_id = excluded.shelf_slot_id",
        params![
            PlacementId::new().to_string(),
            item_id.to_string(),
            shelf_id.to_string(),
            slot_id.to_string(),
            ts(now),
        ],
    )
    .map_err(storage)?;

    let hydrated = hydrate(&tx, owner, shelf_id)?;
    tx.commit().map_err(storage)?;
    Ok(hydrated)
}

/// Remove an item from the shelf. The supplied slot id must match the
/// placement's current slot; displaced placements (null slot) are removable
/// regardless of the slot supplied.
pub fn remove_item(
    conn: &mut Connection,
    owner: UserId,
    shelf_id: ShelfId,
    slot_id: SlotId,
    item_id: ItemId,
) -> Result<HydratedShelf> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(storage)?;
    require_shelf(&tx, owner, shelf_id)?;

    let placement: Option<(String, Option<String>)> = tx
        .query_row(
            "SELECT id, shelf_slot_id FROM item_shelf_locations \
             WHERE shelf_id = ?1 AND item_id = ?2",
            params![shelf_id.to_string(), item_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(storage)?;
    let (placement_id, current_slot) = placement.ok_or_else(|| Error::not_found("placement"))?;

    if let Some(current) = current_slot {
        if current != slot_id.to_string() {
            return Err(Error::validation("item is not placed in that slot"));
        }
    }
    tx.execute("DELETE FROM item_shelf_locations WHERE id = ?1", [placement_id])
        .map_err(storage)?;

    let hydrated = hydrate(&tx, owner, shelf_id)?;
    tx.commit().map_err(storage)?;
    Ok(hydrated)
}

/// Delete a shelf entirely; rows, columns, slots, and placements cascade.
pub fn delete(conn: &mut Connection, owner: UserId, shelf_id: ShelfId) -> Result<()> {
    let changed = conn
        .execute(
            "DELETE FROM shelves WHERE id = ?1 AND owner_id = ?2",
            params![shelf_id.to_string(), owner.to_string()],
        )
        .map_err(storage)?;
    if changed == 0 {
        return Err(Error::not_found("shelf"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Internal loading helpers
// ---------------------------------------------------------------------------

fn require_shelf(conn: &Connection, owner: UserId, shelf_id: ShelfId) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM shelves WHERE id = ?1 AND owner_id = ?2",
            params![shelf_id.to_string(), owner.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage)?;
    exists.map(|_| ()).ok_or_else(|| Error::not_found("shelf"))
}

fn load_rows(conn: &Connection, shelf_id: ShelfId) -> Result<HashMap<u32, ShelfRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, shelf_id, row_index, y_start, y_end FROM shelf_rows WHERE shelf_id = ?1",
        )
        .map_err(storage)?;
    let rows = stmt
        .query_map([shelf_id.to_string()], row_to_shelf_row)
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;
    Ok(rows.into_iter().map(|r| (r.row_index, r)).collect())
}

/// Existing columns keyed by `(rowIndex, colIndex)`.
fn load_columns(
    conn: &Connection,
    shelf_id: ShelfId,
) -> Result<HashMap<(u32, u32), ShelfColumn>> {
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.row_id, c.col_index, c.x_start, c.x_end, r.row_index \
             FROM shelf_columns c JOIN shelf_rows r ON r.id = c.row_id WHERE r.shelf_id = ?1",
        )
        .map_err(storage)?;
    let rows = stmt
        .query_map([shelf_id.to_string()], |row| {
            let column = ShelfColumn {
                id: ColumnId(parse_uuid(0, &row.get::<_, String>(0)?)?),
                row_id: RowId(parse_uuid(1, &row.get::<_, String>(1)?)?),
                col_index: row.get(2)?,
                x_start: row.get(3)?,
                x_end: row.get(4)?,
            };
            let row_index: u32 = row.get(5)?;
            Ok(((row_index, column.col_index), column))
        })
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;
    Ok(rows.into_iter().collect())
}

fn load_slot_ids(conn: &Connection, shelf_id: ShelfId) -> Result<HashMap<(u32, u32), SlotId>> {
    let mut stmt = conn
        .prepare("SELECT row_index, col_index, id FROM shelf_slots WHERE shelf_id = ?1")
        .map_err(storage)?;
    let rows = stmt
        .query_map([shelf_id.to_string()], |row| {
            Ok((
                (row.get::<_, u32>(0)?, row.get::<_, u32>(1)?),
                SlotId(parse_uuid(2, &row.get::<_, String>(2)?)?),
            ))
        })
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;
    Ok(rows.into_iter().collect())
}

fn displaced_for_slot(conn: &Connection, slot_id: SlotId) -> Result<Vec<DisplacedItem>> {
    let mut stmt = conn
        .prepare(
            "SELECT l.id, i.id, i.title, i.creator, i.item_type, i.cover_image \
             FROM item_shelf_locations l JOIN items i ON i.id = l.item_id \
             WHERE l.shelf_slot_id = ?1 ORDER BY l.created_at, l.id",
        )
        .map_err(storage)?;
    let result = stmt
        .query_map([slot_id.to_string()], |row| {
            Ok(DisplacedItem {
                placement_id: PlacementId(parse_uuid(0, &row.get::<_, String>(0)?)?),
                item: row_to_item_summary(row, 1)?,
            })
        })
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage);
    result
}

fn row_to_shelf_row(row: &Row<'_>) -> rusqlite::Result<ShelfRow> {
    Ok(ShelfRow {
        id: RowId(parse_uuid(0, &row.get::<_, String>(0)?)?),
        shelf_id: ShelfId(parse_uuid(1, &row.get::<_, String>(1)?)?),
        row_index: row.get(2)?,
        y_start: row.get(3)?,
        y_end: row.get(4)?,
    })
}

fn row_to_item_summary(row: &Row<'_>, offset: usize) -> rusqlite::Result<ItemSummary> {
    let type_raw: String = row.get(offset + 3)?;
    let item_type = ItemType::parse(&type_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            offset + 3,
            Type::Text,
            format!("unknown item type: {type_raw:?}").into(),
        )
    })?;
    Ok(ItemSummary {
        id: ItemId(parse_uuid(offset, &row.get::<_, String>(offset)?)?),
        title: row.get(offset + 1)?,
        creator: row.get(offset + 2)?,
        item_type,
        cover_image: row.get(offset + 4)?,
    })
}

fn hydrate(conn: &Connection, owner: UserId, shelf_id: ShelfId) -> Result<HydratedShelf> {
    let shelf = conn
        .query_row(
            "SELECT id, owner_id, name, description, photo, created_at, updated_at \
             FROM shelves WHERE id = ?1 AND owner_id = ?2",
            params![shelf_id.to_string(), owner.to_string()],
            |row| {
                Ok(Shelf {
                    id: ShelfId(parse_uuid(0, &row.get::<_, String>(0)?)?),
                    owner_id: UserId(parse_uuid(1, &row.get::<_, String>(1)?)?),
                    name: row.get(2)?,
                    description: row.get(3)?,
                    photo: row.get(4)?,
                    created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
                    updated_at: parse_ts(6, &row.get::<_, String>(6)?)?,
                })
            },
        )
        .optional()
        .map_err(storage)?
        .ok_or_else(|| Error::not_found("shelf"))?;

    let rows: Vec<ShelfRow> = {
        let mut stmt = conn
            .prepare(
                "SELECT id, shelf_id, row_index, y_start, y_end FROM shelf_rows \
                 WHERE shelf_id = ?1 ORDER BY row_index",
            )
            .map_err(storage)?;
        let out = stmt
            .query_map([shelf_id.to_string()], row_to_shelf_row)
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        out
    };

    let columns: Vec<ShelfColumn> = {
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.row_id, c.col_index, c.x_start, c.x_end \
                 FROM shelf_columns c JOIN shelf_rows r ON r.id = c.row_id \
                 WHERE r.shelf_id = ?1 ORDER BY r.row_index, c.col_index",
            )
            .map_err(storage)?;
        let out = stmt
            .query_map([shelf_id.to_string()], |row| {
                Ok(ShelfColumn {
                    id: ColumnId(parse_uuid(0, &row.get::<_, String>(0)?)?),
                    row_id: RowId(parse_uuid(1, &row.get::<_, String>(1)?)?),
                    col_index: row.get(2)?,
                    x_start: row.get(3)?,
                    x_end: row.get(4)?,
                })
            })
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        out
    };

    let slots: Vec<ShelfSlot> = {
        let mut stmt = conn
            .prepare(
                "SELECT id, shelf_id, row_id, column_id, row_index, col_index, x_start, x_end, \
                 y_start, y_end FROM shelf_slots WHERE shelf_id = ?1 ORDER BY row_index, col_index",
            )
            .map_err(storage)?;
        let out = stmt
            .query_map([shelf_id.to_string()], |row| {
                Ok(ShelfSlot {
                    id: SlotId(parse_uuid(0, &row.get::<_, String>(0)?)?),
                    shelf_id: ShelfId(parse_uuid(1, &row.get::<_, String>(1)?)?),
                    row_id: RowId(parse_uuid(2, &row.get::<_, String>(2)?)?),
                    column_id: ColumnId(parse_uuid(3, &row.get::<_, String>(3)?)?),
                    row_index: row.get(4)?,
                    col_index: row.get(5)?,
                    x_start: row.get(6)?,
                    x_end: row.get(7)?,
                    y_start: row.get(8)?,
                    y_end: row.get(9)?,
                })
            })
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        out
    };

    let mut placed = Vec::new();
    let mut unplaced = Vec::new();
    {
        let mut stmt = conn
            .prepare(
                "SELECT l.id, l.shelf_slot_id, i.id, i.title, i.creator, i.item_type, \
                 i.cover_image FROM item_shelf_locations l JOIN items i ON i.id = l.item_id \
                 WHERE l.shelf_id = ?1 ORDER BY l.created_at, l.id",
            )
            .map_err(storage)?;
        let entries = stmt
            .query_map([shelf_id.to_string()], |row| {
                let slot_raw: Option<String> = row.get(1)?;
                let slot_id = slot_raw
                    .map(|raw| parse_uuid(1, &raw))
                    .transpose()?
                    .map(SlotId);
                Ok(PlacedItem {
                    placement_id: PlacementId(parse_uuid(0, &row.get::<_, String>(0)?)?),
                    slot_id,
                    item: row_to_item_summary(row, 2)?,
                })
            })
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        for entry in entries {
            if entry.slot_id.is_some() {
                placed.push(entry);
            } else {
                unplaced.push(entry);
            }
        }
    }

    Ok(HydratedShelf {
        shelf,
        rows,
        columns,
        slots,
        placed,
        unplaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items;
    use crate::test_util::{open_db, seed_user};
    use anthology_common::shelf::{GridColumn, GridRow};
    use anthology_common::{ItemDraft, ItemType};

    fn grid(cells: &[(u32, u32, f64, f64, f64, f64)]) -> ProposedGrid {
        // cells: (row, col, x_start, x_end, y_start, y_end), already grouped.
        let mut rows: Vec<GridRow> = Vec::new();
        for &(row_index, col_index, x_start, x_end, y_start, y_end) in cells {
            if let Some(grow) = rows.iter_mut().find(|r| r.row_index == row_index) {
                grow.y_start = grow.y_start.min(y_start);
                grow.y_end = grow.y_end.max(y_end);
                grow.columns.push(GridColumn {
                    col_index,
                    x_start,
                    x_end,
                });
            } else {
                rows.push(GridRow {
                    row_index,
                    y_start,
                    y_end,
                    columns: vec![GridColumn {
                        col_index,
                        x_start,
                        x_end,
                    }],
                });
            }
        }
        rows.sort_by_key(|r| r.row_index);
        ProposedGrid { rows }
    }

    fn two_by_two() -> ProposedGrid {
        grid(&[
            (0, 0, 0.0, 0.5, 0.0, 0.5),
            (0, 1, 0.5, 1.0, 0.0, 0.5),
            (1, 0, 0.0, 0.5, 0.5, 1.0),
            (1, 1, 0.5, 1.0, 0.5, 1.0),
        ])
    }

    fn seed_item(db: &crate::db::Db, owner: UserId, title: &str) -> ItemId {
        let draft = ItemDraft {
            title: title.to_string(),
            item_type: ItemType::Book,
            ..Default::default()
        };
        items::insert(db.conn(), owner, &draft, Utc::now()).unwrap().id
    }

    #[test]
    fn test_create_scaffold() {
        let mut db = open_db();
        let owner = seed_user(&db, "s1@example.com");
        let shelf = create(
            db.conn_mut(),
            owner.id,
            "Living Room",
            "",
            "",
            0.02,
            0.05,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(shelf.rows.len(), 1);
        assert_eq!(shelf.columns.len(), 1);
        assert_eq!(shelf.slots.len(), 1);
        let slot = &shelf.slots[0];
        assert_eq!((slot.row_index, slot.col_index), (0, 0));
        assert_eq!((slot.x_start, slot.x_end), (0.02, 0.98));
        assert_eq!((slot.y_start, slot.y_end), (0.05, 0.95));
    }

    #[test]
    fn test_duplicate_name_conflicts_per_owner() {
        let mut db = open_db();
        let owner = seed_user(&db, "s2@example.com");
        let other = seed_user(&db, "s3@example.com");
        create(db.conn_mut(), owner.id, "Office", "", "", 0.02, 0.05, Utc::now()).unwrap();
        let err = create(db.conn_mut(), owner.id, "Office", "", "", 0.02, 0.05, Utc::now())
            .unwrap_err();
        assert_eq!(err.http_status(), 409);
        // Same name under a different owner is fine.
        create(db.conn_mut(), other.id, "Office", "", "", 0.02, 0.05, Utc::now()).unwrap();
    }

    #[test]
    fn test_replace_keeps_slot_ids_at_same_grid_position() {
        let mut db = open_db();
        let owner = seed_user(&db, "s4@example.com");
        let shelf = create(db.conn_mut(), owner.id, "A", "", "", 0.02, 0.05, Utc::now()).unwrap();
        let (layout, _) =
            replace_layout(db.conn_mut(), owner.id, shelf.shelf.id, &two_by_two(), Utc::now())
                .unwrap();
        let before: Vec<SlotId> = layout.slots.iter().map(|s| s.id).collect();

        // Same grid, wildly different coordinates: ids must survive.
        let moved = grid(&[
            (0, 0, 0.0, 0.1, 0.0, 0.1),
            (0, 1, 0.8, 0.9, 0.0, 0.1),
            (1, 0, 0.0, 0.1, 0.8, 0.9),
            (1, 1, 0.8, 0.9, 0.8, 0.9),
        ]);
        let (layout, displaced) =
            replace_layout(db.conn_mut(), owner.id, shelf.shelf.id, &moved, Utc::now()).unwrap();
        assert!(displaced.is_empty());
        let after: Vec<SlotId> = layout.slots.iter().map(|s| s.id).collect();
        assert_eq!(before, after);
        assert_eq!(layout.slots[0].x_end, 0.1);
    }

    #[test]
    fn test_replace_displaces_items_from_removed_slots() {
        let mut db = open_db();
        let owner = seed_user(&db, "s5@example.com");
        let shelf = create(db.conn_mut(), owner.id, "B", "", "", 0.02, 0.05, Utc::now()).unwrap();
        let shelf_id = shelf.shelf.id;
        let (layout, _) =
            replace_layout(db.conn_mut(), owner.id, shelf_id, &two_by_two(), Utc::now()).unwrap();

        let item = seed_item(&db, owner.id, "Displaced Book");
        let bottom_left = layout.slot_at(1, 0).unwrap().id;
        assign_item(db.conn_mut(), owner.id, shelf_id, bottom_left, item, Utc::now()).unwrap();

        // Drop row 1 entirely.
        let shrunk = grid(&[
            (0, 0, 0.0, 0.5, 0.0, 0.5),
            (0, 1, 0.5, 1.0, 0.0, 0.5),
        ]);
        let (layout, displaced) =
            replace_layout(db.conn_mut(), owner.id, shelf_id, &shrunk, Utc::now()).unwrap();
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].item.title, "Displaced Book");
        assert_eq!(layout.slots.len(), 2);
        assert_eq!(layout.rows.len(), 1);
        assert_eq!(layout.placed.len(), 0);
        assert_eq!(layout.unplaced.len(), 1);
        assert_eq!(layout.unplaced[0].slot_id, None);
    }

    #[test]
    fn test_replace_grow_mints_fresh_ids_only_for_new_cells() {
        let mut db = open_db();
        let owner = seed_user(&db, "s6@example.com");
        let shelf = create(db.conn_mut(), owner.id, "C", "", "", 0.02, 0.05, Utc::now()).unwrap();
        let original_slot = shelf.slots[0].id;

        let grown = grid(&[
            (0, 0, 0.0, 0.5, 0.0, 0.5),
            (0, 1, 0.5, 1.0, 0.0, 0.5),
            (1, 0, 0.0, 1.0, 0.5, 1.0),
        ]);
        let (layout, displaced) =
            replace_layout(db.conn_mut(), owner.id, shelf.shelf.id, &grown, Utc::now()).unwrap();
        assert!(displaced.is_empty());
        assert_eq!(layout.slots.len(), 3);
        assert_eq!(layout.slot_at(0, 0).unwrap().id, original_slot);
        assert_ne!(layout.slot_at(0, 1).unwrap().id, original_slot);
    }

    #[test]
    fn test_cross_owner_shelf_is_not_found() {
        let mut db = open_db();
        let owner = seed_user(&db, "s7@example.com");
        let intruder = seed_user(&db, "s8@example.com");
        let shelf = create(db.conn_mut(), owner.id, "D", "", "", 0.02, 0.05, Utc::now()).unwrap();

        let err = get_hydrated(db.conn(), intruder.id, shelf.shelf.id).unwrap_err();
        assert_eq!(err.http_status(), 404);
        let err =
            replace_layout(db.conn_mut(), intruder.id, shelf.shelf.id, &two_by_two(), Utc::now())
                .unwrap_err();
        assert_eq!(err.http_status(), 404);
        // Nothing was touched.
        let unchanged = get_hydrated(db.conn(), owner.id, shelf.shelf.id).unwrap();
        assert_eq!(unchanged.slots.len(), 1);
    }

    #[test]
    fn test_assign_move_and_remove() {
        let mut db = open_db();
        let owner = seed_user(&db, "s9@example.com");
        let shelf = create(db.conn_mut(), owner.id, "E", "", "", 0.02, 0.05, Utc::now()).unwrap();
        let shelf_id = shelf.shelf.id;
        let (layout, _) =
            replace_layout(db.conn_mut(), owner.id, shelf_id, &two_by_two(), Utc::now()).unwrap();
        let item = seed_item(&db, owner.id, "Mover");
        let first = layout.slot_at(0, 0).unwrap().id;
        let second = layout.slot_at(0, 1).unwrap().id;

        let layout =
            assign_item(db.conn_mut(), owner.id, shelf_id, first, item, Utc::now()).unwrap();
        assert_eq!(layout.placed.len(), 1);

        // Re-assigning moves the single (shelf, item) placement.
        let layout =
            assign_item(db.conn_mut(), owner.id, shelf_id, second, item, Utc::now()).unwrap();
        assert_eq!(layout.placed.len(), 1);
        assert_eq!(layout.placed[0].slot_id, Some(second));

        // Removing with the wrong slot is a validation error.
        let err = remove_item(db.conn_mut(), owner.id, shelf_id, first, item).unwrap_err();
        assert_eq!(err.http_status(), 422);

        let layout = remove_item(db.conn_mut(), owner.id, shelf_id, second, item).unwrap();
        assert!(layout.placed.is_empty());
        assert!(layout.unplaced.is_empty());
    }

    #[test]
    fn test_assign_rejects_foreign_slot_and_item() {
        let mut db = open_db();
        let owner = seed_user(&db, "s10@example.com");
        let shelf = create(db.conn_mut(), owner.id, "F", "", "", 0.02, 0.05, Utc::now()).unwrap();
        let slot = shelf.slots[0].id;
        let item = seed_item(&db, owner.id, "X");

        let err = assign_item(db.conn_mut(), owner.id, shelf.shelf.id, SlotId::new(), item, Utc::now())
            .unwrap_err();
        assert_eq!(err.http_status(), 404);

        let other = seed_user(&db, "s11@example.com");
        let foreign_item = seed_item(&db, other.id, "Foreign");
        let err = assign_item(db.conn_mut(), owner.id, shelf.shelf.id, slot, foreign_item, Utc::now())
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_item_delete_cascades_placement() {
        let mut db = open_db();
        let owner = seed_user(&db, "s12@example.com");
        let shelf = create(db.conn_mut(), owner.id, "G", "", "", 0.02, 0.05, Utc::now()).unwrap();
        let item = seed_item(&db, owner.id, "Ephemeral");
        assign_item(db.conn_mut(), owner.id, shelf.shelf.id, shelf.slots[0].id, item, Utc::now())
            .unwrap();
        items::delete(db.conn(), owner.id, item).unwrap();
        let layout = get_hydrated(db.conn(), owner.id, shelf.shelf.id).unwrap();
        assert!(layout.placed.is_empty());
    }

    #[test]
    fn test_list_summaries_counts() {
        let mut db = open_db();
        let owner = seed_user(&db, "s13@example.com");
        let shelf = create(db.conn_mut(), owner.id, "H", "desc", "", 0.02, 0.05, Utc::now()).unwrap();
        let item = seed_item(&db, owner.id, "Counted");
        assign_item(db.conn_mut(), owner.id, shelf.shelf.id, shelf.slots[0].id, item, Utc::now())
            .unwrap();

        let summaries = list(db.conn(), owner.id).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].slot_count, 1);
        assert_eq!(summaries[0].item_count, 1);
    }
}
