//! Owner-scoped item repository.
//!
//! Every query here carries `owner_id` in its WHERE clause, including
//! single-row lookups; a row owned by a different user is indistinguishable
//! from a missing row.

use std::collections::{BTreeMap, HashMap};

use anthology_common::item::{PlacementSummary, ShelfStatus};
use anthology_common::{
    Error, Item, ItemDraft, ItemFilter, ItemId, ItemType, ReadingStatus, Result, ShelfId, SlotId,
    UserId,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{opt_ts, parse_opt_ts, parse_ts, parse_uuid, storage, ts};

const ITEM_COLUMNS: &str = "id, owner_id, title, creator, item_type, release_year, page_count, \
     current_page, isbn13, isbn10, description, cover_image, format, genre, rating, retail_price, \
     volume_id, reading_status, read_at, series_name, series_volume, series_total, platform, \
     age_group, player_count, notes, created_at, updated_at";

fn bad_enum(column: usize, what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        format!("unknown {what}: {raw:?}").into(),
    )
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    let type_raw: String = row.get(4)?;
    let item_type = ItemType::parse(&type_raw).ok_or_else(|| bad_enum(4, "item type", &type_raw))?;
    let status_raw: Option<String> = row.get(17)?;
    let reading_status = match status_raw {
        None => None,
        Some(raw) => {
            Some(ReadingStatus::parse(&raw).ok_or_else(|| bad_enum(17, "reading status", &raw))?)
        }
    };

    Ok(Item {
        id: ItemId(parse_uuid(0, &row.get::<_, String>(0)?)?),
        owner_id: UserId(parse_uuid(1, &row.get::<_, String>(1)?)?),
        title: row.get(2)?,
        creator: row.get(3)?,
        item_type,
        release_year: row.get(5)?,
        page_count: row.get(6)?,
        current_page: row.get(7)?,
        isbn13: row.get(8)?,
        isbn10: row.get(9)?,
        description: row.get(10)?,
        cover_image: row.get(11)?,
        format: row.get(12)?,
        genre: row.get(13)?,
        rating: row.get(14)?,
        retail_price: row.get(15)?,
        volume_id: row.get(16)?,
        reading_status,
        read_at: parse_opt_ts(18, row.get(18)?)?,
        series_name: row.get(19)?,
        series_volume: row.get(20)?,
        series_total: row.get(21)?,
        platform: row.get(22)?,
        age_group: row.get(23)?,
        player_count: row.get(24)?,
        notes: row.get(25)?,
        created_at: parse_ts(26, &row.get::<_, String>(26)?)?,
        updated_at: parse_ts(27, &row.get::<_, String>(27)?)?,
        placement: None,
    })
}

pub fn insert(conn: &Connection, owner: UserId, draft: &ItemDraft, now: DateTime<Utc>) -> Result<Item> {
    let id = ItemId::new();
    conn.execute(
        "INSERT INTO items (id, owner_id, title, creator, item_type, release_year, page_count, \
         current_page, isbn13, isbn10, description, cover_image, format, genre, rating, \
         retail_price, volume_id, reading_status, read_at, series_name, series_volume, \
         series_total, platform, age_group, player_count, notes, created_at, updated_at) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, \
         ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)",
        params![
            id.to_string(),
            owner.to_string(),
            draft.title,
            draft.creator,
            draft.item_type.as_str(),
            draft.release_year,
            draft.page_count,
            draft.current_page,
            draft.isbn13,
            draft.isbn10,
            draft.description,
            draft.cover_image,
            draft.format,
            draft.genre,
            draft.rating,
            draft.retail_price,
            draft.volume_id,
            draft.reading_status.map(|s| s.as_str()),
            opt_ts(draft.read_at),
            draft.series_name,
            draft.series_volume,
            draft.series_total,
            draft.platform,
            draft.age_group,
            draft.player_count,
            draft.notes,
            ts(now),
            ts(now),
        ],
    )
    .map_err(storage)?;
    get(conn, owner, id)
}

pub fn update(
    conn: &Connection,
    owner: UserId,
    id: ItemId,
    draft: &ItemDraft,
    now: DateTime<Utc>,
) -> Result<Item> {
    let changed = conn
        .execute(
            "UPDATE items SET title = ?1, creator = ?2, item_type = ?3, release_year = ?4, \
             page_count = ?5, current_page = ?6, isbn13 = ?7, isbn10 = ?8, description = ?9, \
             cover_image = ?10, format = ?11, genre = ?12, rating = ?13, retail_price = ?14, \
             volume_id = ?15, reading_status = ?16, read_at = ?17, series_name = ?18, \
             series_volume = ?19, series_total = ?20, platform = ?21, age_group = ?22, \
             player_count = ?23, notes = ?24, updated_at = ?25 \
             WHERE id = ?26 AND owner_id = ?27",
            params![
                draft.title,
                draft.creator,
                draft.item_type.as_str(),
                draft.release_year,
                draft.page_count,
                draft.current_page,
                draft.isbn13,
                draft.isbn10,
                draft.description,
                draft.cover_image,
                draft.format,
                draft.genre,
                draft.rating,
                draft.retail_price,
                draft.volume_id,
                draft.reading_status.map(|s| s.as_str()),
                opt_ts(draft.read_at),
                draft.series_name,
                draft.series_volume,
                draft.series_total,
                draft.platform,
                draft.age_group,
                draft.player_count,
                draft.notes,
                ts(now),
                id.to_string(),
                owner.to_string(),
            ],
        )
        .map_err(storage)?;
    if changed == 0 {
        return Err(Error::not_found("item"));
    }
    get(conn, owner, id)
}

pub fn delete(conn: &Connection, owner: UserId, id: ItemId) -> Result<()> {
    let changed = conn
        .execute(
            "DELETE FROM items WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner.to_string()],
        )
        .map_err(storage)?;
    if changed == 0 {
        return Err(Error::not_found("item"));
    }
    Ok(())
}

pub fn get(conn: &Connection, owner: UserId, id: ItemId) -> Result<Item> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1 AND owner_id = ?2"),
            params![id.to_string(), owner.to_string()],
            row_to_item,
        )
        .optional()
        .map_err(storage)?;
    let mut item = item.ok_or_else(|| Error::not_found("item"))?;
    attach_placements(conn, std::slice::from_mut(&mut item))?;
    Ok(item)
}

/// Append the filter's WHERE fragments. Every bound value is textual; the
/// limit is validated upstream and inlined.
fn push_filters(filter: &ItemFilter, include_letter: bool, sql: &mut String, args: &mut Vec<String>) {
    if let Some(item_type) = filter.item_type {
        sql.push_str(" AND item_type = ?");
        args.push(item_type.as_str().to_string());
    }
    if let Some(status) = filter.reading_status {
        sql.push_str(" AND reading_status = ?");
        args.push(status.as_str().to_string());
    }
    match filter.shelf_status {
        ShelfStatus::Any => {}
        ShelfStatus::OnAnyShelf => {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM item_shelf_locations l WHERE l.item_id = items.id)",
            );
        }
        ShelfStatus::OffAllShelves => {
            sql.push_str(
                " AND NOT EXISTS (SELECT 1 FROM item_shelf_locations l WHERE l.item_id = items.id)",
            );
        }
    }
    if include_letter {
        match filter.letter {
            Some('#') => {
                sql.push_str(" AND upper(substr(trim(title), 1, 1)) NOT BETWEEN 'A' AND 'Z'");
            }
            Some(letter) => {
                sql.push_str(" AND upper(substr(trim(title), 1, 1)) = ?");
                args.push(letter.to_ascii_uppercase().to_string());
            }
            None => {}
        }
    }
    if let Some(query) = filter.query.as_deref() {
        let needle = query.trim().to_lowercase();
        if !needle.is_empty() {
            sql.push_str(" AND (instr(lower(title), ?) > 0 OR instr(lower(creator), ?) > 0)");
            args.push(needle.clone());
            args.push(needle);
        }
    }
}

pub fn list(conn: &Connection, owner: UserId, filter: &ItemFilter) -> Result<Vec<Item>> {
    let mut sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE owner_id = ?");
    let mut args = vec![owner.to_string()];
    push_filters(filter, true, &mut sql, &mut args);
    sql.push_str(" ORDER BY title COLLATE NOCASE, created_at");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql).map_err(storage)?;
    let mut items = stmt
        .query_map(params_from_iter(args.iter()), row_to_item)
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;
    attach_placements(conn, &mut items)?;
    Ok(items)
}

/// Letter histogram over the same filters minus the letter itself. Non A–Z
/// leading characters fold into the `'#'` bucket.
pub fn letter_histogram(
    conn: &Connection,
    owner: UserId,
    filter: &ItemFilter,
) -> Result<BTreeMap<char, u64>> {
    let mut sql =
        String::from("SELECT upper(substr(trim(title), 1, 1)), COUNT(*) FROM items WHERE owner_id = ?");
    let mut args = vec![owner.to_string()];
    push_filters(filter, false, &mut sql, &mut args);
    sql.push_str(" GROUP BY 1");

    let mut stmt = conn.prepare(&sql).map_err(storage)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;

    let mut histogram = BTreeMap::new();
    for (leading, count) in rows {
        let bucket = match leading.chars().next() {
            Some(c) if c.is_ascii_uppercase() => c,
            _ => '#',
        };
        *histogram.entry(bucket).or_insert(0) += count as u64;
    }
    Ok(histogram)
}

/// All items of a series, ordered by volume number (unnumbered volumes
/// last).
pub fn list_series(conn: &Connection, owner: UserId, series_name: &str) -> Result<Vec<Item>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE owner_id = ?1 AND series_name = ?2 \
             ORDER BY series_volume IS NULL, series_volume, title COLLATE NOCASE"
        ))
        .map_err(storage)?;
    let mut items = stmt
        .query_map(params![owner.to_string(), series_name], row_to_item)
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;
    attach_placements(conn, &mut items)?;
    Ok(items)
}

/// Raw dedup key sources for the owner's whole catalog, consumed by the CSV
/// importer's duplicate tracker.
#[derive(Debug, Clone)]
pub struct DedupSource {
    pub title: String,
    pub isbn13: String,
    pub isbn10: String,
}

pub fn dedup_sources(conn: &Connection, owner: UserId) -> Result<Vec<DedupSource>> {
    let mut stmt = conn
        .prepare("SELECT title, isbn13, isbn10 FROM items WHERE owner_id = ?1")
        .map_err(storage)?;
    let result = stmt
        .query_map([owner.to_string()], |row| {
            Ok(DedupSource {
                title: row.get(0)?,
                isbn13: row.get(1)?,
                isbn10: row.get(2)?,
            })
        })
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage);
    result
}

/// Join each item with its most recent placement (if any) to fill the
/// primary shelf summary.
fn attach_placements(conn: &Connection, items: &mut [Item]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; items.len()].join(", ");
    let sql = format!(
        "SELECT l.item_id, l.shelf_id, s.name, l.shelf_slot_id, sl.row_index, sl.col_index \
         FROM item_shelf_locations l \
         JOIN shelves s ON s.id = l.shelf_id \
         LEFT JOIN shelf_slots sl ON sl.id = l.shelf_slot_id \
         WHERE l.item_id IN ({placeholders}) \
         ORDER BY l.created_at DESC, l.id DESC"
    );
    let ids: Vec<String> = items.iter().map(|i| i.id.to_string()).collect();
    let mut stmt = conn.prepare(&sql).map_err(storage)?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), |row| {
            let item_id = parse_uuid(0, &row.get::<_, String>(0)?)?;
            let shelf_id = parse_uuid(1, &row.get::<_, String>(1)?)?;
            let slot_id: Option<String> = row.get(3)?;
            let slot_id = slot_id
                .map(|raw| parse_uuid(3, &raw))
                .transpose()?
                .map(SlotId);
            Ok((
                ItemId(item_id),
                PlacementSummary {
                    shelf_id: ShelfId(shelf_id),
                    shelf_name: row.get(2)?,
                    slot_id,
                    row_index: row.get::<_, Option<u32>>(4)?,
                    col_index: row.get::<_, Option<u32>>(5)?,
                },
            ))
        })
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;

    // Rows arrive newest-first; the first summary per item wins.
    let mut latest: HashMap<Uuid, PlacementSummary> = HashMap::new();
    for (item_id, summary) in rows {
        latest.entry(item_id.0).or_insert(summary);
    }
    for item in items.iter_mut() {
        item.placement = latest.get(&item.id.0).cloned();
    }
    Ok(())
}
