//! CSV export of an owner's full catalog.
//!
//! The header row is schema-versioned via a `schemaVersion` column carried
//! on every row; the importer ignores columns it does not know, so exports
//! round-trip cleanly (existing items deduplicate against themselves).

use std::io::Write;

use anthology_common::{Error, Item, ItemFilter, Result, UserId};
use anthology_store::{items, Db};

pub const EXPORT_SCHEMA_VERSION: &str = "1";

/// Documented column order. The importer's required set is a subset.
pub const EXPORT_COLUMNS: &[&str] = &[
    "schemaVersion",
    "title",
    "creator",
    "itemType",
    "releaseYear",
    "pageCount",
    "currentPage",
    "isbn13",
    "isbn10",
    "description",
    "coverImage",
    "format",
    "genre",
    "rating",
    "retailPrice",
    "readingStatus",
    "readAt",
    "seriesName",
    "seriesVolume",
    "seriesTotal",
    "platform",
    "ageGroup",
    "playerCount",
    "notes",
];

/// Stream the owner's items as CSV. Returns the number of data rows
/// written.
pub fn export_csv<W: Write>(db: &mut Db, owner: UserId, writer: W) -> Result<u64> {
    let all = items::list(db.conn(), owner, &ItemFilter::default())?;

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_COLUMNS).map_err(write_err)?;
    let mut written = 0u64;
    for item in &all {
        out.write_record(item_record(item)).map_err(write_err)?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

fn item_record(item: &Item) -> Vec<String> {
    vec![
        EXPORT_SCHEMA_VERSION.to_string(),
        item.title.clone(),
        item.creator.clone(),
        item.item_type.as_str().to_string(),
        opt_int(item.release_year),
        opt_int(item.page_count),
        opt_int(item.current_page),
        item.isbn13.clone(),
        item.isbn10.clone(),
        item.description.clone(),
        item.cover_image.clone(),
        item.format.clone(),
        item.genre.clone(),
        opt_int(item.rating),
        item.retail_price.map(|p| p.to_string()).unwrap_or_default(),
        item.reading_status
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        item.read_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        item.series_name.clone(),
        opt_int(item.series_volume),
        opt_int(item.series_total),
        item.platform.clone(),
        item.age_group.clone(),
        item.player_count.clone(),
        item.notes.clone(),
    ]
}

fn opt_int(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_err(err: csv::Error) -> Error {
    Error::Io(std::io::Error::other(err.to_string()))
}
