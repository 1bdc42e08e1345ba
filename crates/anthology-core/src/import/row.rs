//! Per-row parsing: cells into an [`ItemDraft`] or a row-error message.

use anthology_common::{ItemDraft, ItemType, ReadingStatus};
use chrono::{DateTime, Utc};

use super::header::HeaderIndex;

/// Per-field signedness rules for integer columns.
#[derive(Debug, Clone, Copy)]
enum IntRule {
    Positive,
    NonNegative,
}

fn parse_int(column: &str, raw: &str, rule: IntRule) -> Result<Option<i32>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value: i32 = raw
        .parse()
        .map_err(|_| format!("{column} is not a whole number: {raw:?}"))?;
    match rule {
        IntRule::Positive if value <= 0 => Err(format!("{column} must be positive, got {value}")),
        IntRule::NonNegative if value < 0 => {
            Err(format!("{column} must not be negative, got {value}"))
        }
        _ => Ok(Some(value)),
    }
}

fn parse_price(column: &str, raw: &str) -> Result<Option<f64>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{column} is not a number: {raw:?}"))?;
    if value < 0.0 {
        return Err(format!("{column} must not be negative, got {value}"));
    }
    Ok(Some(value))
}

/// RFC 3339 with nanosecond tolerance.
fn parse_timestamp(column: &str, raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| format!("{column} is not an RFC 3339 timestamp: {e}"))
}

/// Build a draft from one data row. Semantic validation (title presence
/// after enrichment, status transitions, cover rules) runs later in the
/// pipeline.
pub fn build_draft(header: &HeaderIndex, record: &csv::StringRecord) -> Result<ItemDraft, String> {
    let type_raw = header.get(record, "itemtype");
    let item_type = ItemType::parse(type_raw)
        .ok_or_else(|| format!("unknown item type: {type_raw:?}"))?;

    let status_raw = header.get(record, "readingstatus");
    let reading_status = if status_raw.is_empty() {
        None
    } else {
        Some(
            ReadingStatus::parse(status_raw)
                .ok_or_else(|| format!("unknown reading status: {status_raw:?}"))?,
        )
    };

    Ok(ItemDraft {
        title: header.get(record, "title").to_string(),
        creator: header.get(record, "creator").to_string(),
        item_type,
        release_year: parse_int("releaseYear", header.get(record, "releaseyear"), IntRule::Positive)?,
        page_count: parse_int("pageCount", header.get(record, "pagecount"), IntRule::Positive)?,
        current_page: parse_int(
            "currentPage",
            header.get(record, "currentpage"),
            IntRule::NonNegative,
        )?,
        isbn13: header.get(record, "isbn13").to_string(),
        isbn10: header.get(record, "isbn10").to_string(),
        description: header.get(record, "description").to_string(),
        cover_image: header.get(record, "coverimage").to_string(),
        format: header.get(record, "format").to_string(),
        genre: header.get(record, "genre").to_string(),
        rating: parse_int("rating", header.get(record, "rating"), IntRule::Positive)?,
        retail_price: parse_price("retailPrice", header.get(record, "retailprice"))?,
        volume_id: String::new(),
        reading_status,
        read_at: parse_timestamp("readAt", header.get(record, "readat"))?,
        series_name: header.get(record, "seriesname").to_string(),
        series_volume: parse_int(
            "seriesVolume",
            header.get(record, "seriesvolume"),
            IntRule::Positive,
        )?,
        series_total: parse_int(
            "seriesTotal",
            header.get(record, "seriestotal"),
            IntRule::Positive,
        )?,
        platform: header.get(record, "platform").to_string(),
        age_group: header.get(record, "agegroup").to_string(),
        player_count: header.get(record, "playercount").to_string(),
        notes: header.get(record, "notes").to_string(),
    })
}
