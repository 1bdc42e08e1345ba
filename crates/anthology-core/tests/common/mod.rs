//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use anthology_common::shelf::ProposedSlot;
use anthology_common::user::User;
use anthology_common::{ItemDraft, ItemType, UserId};
use anthology_store::{users, Db};
use chrono::Utc;

pub fn open_db() -> Db {
    Db::open_in_memory().expect("in-memory database")
}

pub fn seed_user(db: &Db, email: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: UserId::new(),
        email: email.to_string(),
        display_name: "Integration Owner".to_string(),
        avatar_url: String::new(),
        oauth_provider: "google".to_string(),
        oauth_subject: format!("sub-{email}"),
        created_at: now,
        updated_at: now,
        last_login_at: None,
    };
    users::insert(db.conn(), &user).expect("insert user");
    user
}

pub fn book(title: &str) -> ItemDraft {
    ItemDraft {
        title: title.to_string(),
        item_type: ItemType::Book,
        ..Default::default()
    }
}

pub fn cell(row: u32, col: u32, x: (f64, f64), y: (f64, f64)) -> ProposedSlot {
    ProposedSlot {
        slot_id: None,
        row_index: row,
        col_index: col,
        x_start: x.0,
        x_end: x.1,
        y_start: y.0,
        y_end: y.1,
    }
}

/// An R-row grid with `cols[r]` columns in row r, evenly dividing the unit
/// square with touching boundaries.
pub fn even_grid(cols: &[u32]) -> Vec<ProposedSlot> {
    let row_count = cols.len() as u32;
    let mut slots = Vec::new();
    for (row, &col_count) in cols.iter().enumerate() {
        let row = row as u32;
        let y = (
            row as f64 / row_count as f64,
            (row + 1) as f64 / row_count as f64,
        );
        for col in 0..col_count {
            let x = (
                col as f64 / col_count as f64,
                (col + 1) as f64 / col_count as f64,
            );
            slots.push(cell(row, col, x, y));
        }
    }
    slots
}
