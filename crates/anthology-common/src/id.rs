//! Entity identity types.
//!
//! Every persisted entity carries a UUID v4 identifier wrapped in its own
//! newtype so that a shelf id can never be passed where an item id is
//! expected. Identifiers serialize as canonical hyphenated strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            /// Parse a canonical hyphenated UUID string.
            pub fn parse(s: &str) -> Option<Self> {
                Uuid::parse_str(s).ok().map($name)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map($name)
            }
        }
    };
}

entity_id! {
    /// Owner of all catalog and shelf data.
    UserId
}

entity_id! {
    /// A stored login session (the row, not the opaque token).
    SessionId
}

entity_id! {
    /// A catalog item (book, game, movie, music).
    ItemId
}

entity_id! {
    /// A photographed shelf.
    ShelfId
}

entity_id! {
    /// A horizontal band of a shelf.
    RowId
}

entity_id! {
    /// A column within a shelf row.
    ColumnId
}

entity_id! {
    /// A materialized (row, column) grid cell.
    SlotId
}

entity_id! {
    /// An item-to-shelf placement.
    PlacementId
}
