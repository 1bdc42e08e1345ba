//! Item field validation and reading-status transition rules.

use anthology_common::{Error, ItemDraft, ItemType, ReadingStatus, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};

const MAX_COVER_URL_CHARS: usize = 4096;
const MAX_COVER_DATA_BYTES: usize = 500 * 1024;

/// Field-level checks, run after normalization and before status rules.
pub fn validate_draft(draft: &ItemDraft) -> Result<()> {
    if draft.title.is_empty() {
        return Err(Error::validation("title is required"));
    }

    for (name, value) in [
        ("releaseYear", draft.release_year),
        ("pageCount", draft.page_count),
        ("rating", draft.rating),
        ("seriesVolume", draft.series_volume),
        ("seriesTotal", draft.series_total),
    ] {
        if let Some(v) = value {
            if v <= 0 {
                return Err(Error::validation(format!("{name} must be positive, got {v}")));
            }
        }
    }
    if let Some(current) = draft.current_page {
        if current < 0 {
            return Err(Error::validation(format!(
                "currentPage must not be negative, got {current}"
            )));
        }
        if let Some(pages) = draft.page_count {
            if current > pages {
                return Err(Error::validation(format!(
                    "currentPage {current} exceeds pageCount {pages}"
                )));
            }
        }
    }
    if let Some(price) = draft.retail_price {
        if price < 0.0 {
            return Err(Error::validation(format!(
                "retailPrice must not be negative, got {price}"
            )));
        }
    }

    validate_cover_image(&draft.cover_image)?;

    if draft.item_type != ItemType::Book && draft.reading_status.is_some() {
        return Err(Error::validation(format!(
            "reading status only applies to books, not {}",
            draft.item_type
        )));
    }
    Ok(())
}

/// Validate a cover image (or shelf photo): empty is fine, a data URI must
/// be valid base64 within the decoded cap, a URL must be http(s) within the
/// length cap.
pub fn validate_cover_image(value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    if let Some(rest) = value.strip_prefix("data:") {
        let payload = rest
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| Error::validation("cover image data URI must be base64 encoded"))?;
        let decoded = BASE64_STANDARD
            .decode(payload)
            .map_err(|_| Error::validation("cover image data URI is not valid base64"))?;
        if decoded.len() > MAX_COVER_DATA_BYTES {
            return Err(Error::validation(format!(
                "cover image exceeds {MAX_COVER_DATA_BYTES} decoded bytes"
            )));
        }
        return Ok(());
    }
    if value.chars().count() > MAX_COVER_URL_CHARS {
        return Err(Error::validation(format!(
            "cover image URL exceeds {MAX_COVER_URL_CHARS} characters"
        )));
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(Error::validation(
            "cover image must be an http(s) URL or data URI",
        ));
    }
    Ok(())
}

/// Apply status-dependent transitions in place:
/// - `read` keeps a provided read-at timestamp, defaulting it to `now`;
/// - `reading` requires a current page (bounded by page count upstream);
/// - `want_to_read` clears read-at and current page;
/// - no status clears the read-at timestamp.
pub fn apply_status_rules(draft: &mut ItemDraft, now: DateTime<Utc>) -> Result<()> {
    match draft.reading_status {
        Some(ReadingStatus::Read) => {
            if draft.read_at.is_none() {
                draft.read_at = Some(now);
            }
        }
        Some(ReadingStatus::Reading) => {
            if draft.current_page.is_none() {
                return Err(Error::validation(
                    "currentPage is required while a book is being read",
                ));
            }
            draft.read_at = None;
        }
        Some(ReadingStatus::WantToRead) => {
            draft.read_at = None;
            draft.current_page = None;
        }
        None => {
            draft.read_at = None;
        }
    }
    Ok(())
}
