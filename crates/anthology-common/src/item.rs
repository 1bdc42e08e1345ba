//! Catalog item types and list filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ItemId, ShelfId, SlotId, UserId};

/// Kind of media an item catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Book,
    Game,
    Movie,
    Music,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Book => "book",
            ItemType::Game => "game",
            ItemType::Movie => "movie",
            ItemType::Music => "music",
        }
    }

    /// Case-insensitive parse; returns `None` for unknown kinds.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "book" => Some(ItemType::Book),
            "game" => Some(ItemType::Game),
            "movie" => Some(ItemType::Movie),
            "music" => Some(ItemType::Music),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reading progress for book items. Other item types carry no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    WantToRead,
    Reading,
    Read,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "want_to_read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "want_to_read" => Some(ReadingStatus::WantToRead),
            "reading" => Some(ReadingStatus::Reading),
            "read" => Some(ReadingStatus::Read),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shelf-membership filter for item listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShelfStatus {
    #[default]
    Any,
    OnAnyShelf,
    OffAllShelves,
}

/// The item's primary shelf placement, chosen by most-recent placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementSummary {
    pub shelf_id: ShelfId,
    pub shelf_name: String,
    /// `None` when the item belongs to the shelf but is unplaced.
    pub slot_id: Option<SlotId>,
    pub row_index: Option<u32>,
    pub col_index: Option<u32>,
}

/// A catalog item as stored and served.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub owner_id: UserId,
    pub title: String,
    pub creator: String,
    pub item_type: ItemType,
    pub release_year: Option<i32>,
    pub page_count: Option<i32>,
    pub current_page: Option<i32>,
    pub isbn13: String,
    pub isbn10: String,
    pub description: String,
    pub cover_image: String,
    pub format: String,
    pub genre: String,
    pub rating: Option<i32>,
    pub retail_price: Option<f64>,
    pub volume_id: String,
    pub reading_status: Option<ReadingStatus>,
    pub read_at: Option<DateTime<Utc>>,
    pub series_name: String,
    pub series_volume: Option<i32>,
    pub series_total: Option<i32>,
    pub platform: String,
    pub age_group: String,
    pub player_count: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Computed on read; never persisted on the item row itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementSummary>,
}

/// Input for creating or updating an item. Owner, ids, and timestamps are
/// assigned by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemDraft {
    pub title: String,
    #[serde(default)]
    pub creator: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub current_page: Option<i32>,
    #[serde(default)]
    pub isbn13: String,
    #[serde(default)]
    pub isbn10: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub retail_price: Option<f64>,
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub reading_status: Option<ReadingStatus>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub series_name: String,
    #[serde(default)]
    pub series_volume: Option<i32>,
    #[serde(default)]
    pub series_total: Option<i32>,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub age_group: String,
    #[serde(default)]
    pub player_count: String,
    #[serde(default)]
    pub notes: String,
}

impl Default for ItemType {
    fn default() -> Self {
        ItemType::Book
    }
}

/// Composable listing filters, combined with AND. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub item_type: Option<ItemType>,
    /// Only meaningful for books.
    pub reading_status: Option<ReadingStatus>,
    pub shelf_status: ShelfStatus,
    /// `'A'..='Z'`, or `'#'` for titles starting with anything else.
    pub letter: Option<char>,
    /// Case-insensitive substring match on title OR creator.
    pub query: Option<String>,
    pub limit: Option<u32>,
}

impl ItemFilter {
    /// The same filter with the leading-letter constraint removed, as used by
    /// the letter histogram.
    pub fn without_letter(&self) -> Self {
        let mut f = self.clone();
        f.letter = None;
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_parse() {
        assert_eq!(ItemType::parse("book"), Some(ItemType::Book));
        assert_eq!(ItemType::parse(" Movie "), Some(ItemType::Movie));
        assert_eq!(ItemType::parse("MUSIC"), Some(ItemType::Music));
        assert_eq!(ItemType::parse("vinyl"), None);
        assert_eq!(ItemType::parse(""), None);
    }

    #[test]
    fn test_reading_status_parse() {
        assert_eq!(
            ReadingStatus::parse("want_to_read"),
            Some(ReadingStatus::WantToRead)
        );
        assert_eq!(ReadingStatus::parse("Read"), Some(ReadingStatus::Read));
        assert_eq!(ReadingStatus::parse("finished"), None);
    }

    #[test]
    fn test_item_type_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ItemType::Game).unwrap(), "\"game\"");
        let t: ItemType = serde_json::from_str("\"music\"").unwrap();
        assert_eq!(t, ItemType::Music);
    }

    #[test]
    fn test_draft_rejects_unknown_fields() {
        let json = r#"{"title":"T","itemType":"book","bogus":1}"#;
        assert!(serde_json::from_str::<ItemDraft>(json).is_err());
    }

    #[test]
    fn test_filter_without_letter() {
        let f = ItemFilter {
            letter: Some('B'),
            item_type: Some(ItemType::Book),
            ..Default::default()
        };
        let g = f.without_letter();
        assert_eq!(g.letter, None);
        assert_eq!(g.item_type, Some(ItemType::Book));
    }
}
