//! Shelf service: the public layout engine API.
//!
//! Validation happens here; the diff-aware persistence lives in the shelf
//! repository. Every operation takes the owner explicitly, and a shelf that
//! belongs to someone else is indistinguishable from a missing one.

pub mod layout;

use anthology_common::shelf::{DisplacedItem, HydratedShelf, ProposedSlot, ShelfSummary};
use anthology_common::{Error, ItemId, Result, ShelfId, SlotId, UserId};
use anthology_config::LayoutConfig;
use anthology_store::{shelves, Db};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::item::validate::validate_cover_image;

/// Result of a layout replacement: the new hydrated layout plus every
/// placement the call displaced.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutChange {
    pub shelf: HydratedShelf,
    pub displaced_items: Vec<DisplacedItem>,
}

#[derive(Debug, Clone)]
pub struct ShelfService {
    margin_x: f64,
    margin_y: f64,
}

impl ShelfService {
    pub fn new(config: &LayoutConfig) -> Self {
        ShelfService {
            margin_x: config.margin_x,
            margin_y: config.margin_y,
        }
    }

    /// Create a shelf with its initial scaffold: one row, one full-span
    /// column, one slot covering the photo interior.
    pub fn create(
        &self,
        db: &mut Db,
        owner: UserId,
        name: &str,
        description: &str,
        photo: &str,
    ) -> Result<HydratedShelf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("shelf name is required"));
        }
        validate_cover_image(photo)?;
        shelves::create(
            db.conn_mut(),
            owner,
            name,
            description,
            photo,
            self.margin_x,
            self.margin_y,
            Utc::now(),
        )
    }

    pub fn get(&self, db: &mut Db, owner: UserId, shelf_id: ShelfId) -> Result<HydratedShelf> {
        shelves::get_hydrated(db.conn(), owner, shelf_id)
    }

    pub fn list(&self, db: &mut Db, owner: UserId) -> Result<Vec<ShelfSummary>> {
        shelves::list(db.conn(), owner)
    }

    /// Validate a proposed grid and reconcile it against the persisted
    /// layout. Rejected proposals write nothing.
    pub fn replace_layout(
        &self,
        db: &mut Db,
        owner: UserId,
        shelf_id: ShelfId,
        proposed: &[ProposedSlot],
    ) -> Result<LayoutChange> {
        let grid = layout::derive_grid(proposed)?;
        let (shelf, displaced_items) =
            shelves::replace_layout(db.conn_mut(), owner, shelf_id, &grid, Utc::now())?;
        Ok(LayoutChange {
            shelf,
            displaced_items,
        })
    }

    pub fn assign_item(
        &self,
        db: &mut Db,
        owner: UserId,
        shelf_id: ShelfId,
        slot_id: SlotId,
        item_id: ItemId,
    ) -> Result<HydratedShelf> {
        shelves::assign_item(db.conn_mut(), owner, shelf_id, slot_id, item_id, Utc::now())
    }

    pub fn remove_item(
        &self,
        db: &mut Db,
        owner: UserId,
        shelf_id: ShelfId,
        slot_id: SlotId,
        item_id: ItemId,
    ) -> Result<HydratedShelf> {
        shelves::remove_item(db.conn_mut(), owner, shelf_id, slot_id, item_id)
    }

    pub fn delete(&self, db: &mut Db, owner: UserId, shelf_id: ShelfId) -> Result<()> {
        shelves::delete(db.conn_mut(), owner, shelf_id)
    }
}
