//! Database schema and migrations.
//!
//! Migrations are append-only and tracked through `PRAGMA user_version`.
//! UUIDs persist as canonical hyphenated TEXT, timestamps as fixed-width
//! RFC 3339 TEXT (see `db::ts`).

use anthology_common::Result;
use rusqlite::Connection;

use crate::db::storage;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

const MIGRATION_V1: &str = r#"
CREATE TABLE users (
    id              TEXT PRIMARY KEY,
    email           TEXT NOT NULL,
    display_name    TEXT NOT NULL DEFAULT '',
    avatar_url      TEXT NOT NULL DEFAULT '',
    oauth_provider  TEXT NOT NULL,
    oauth_subject   TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    last_login_at   TEXT
);
CREATE UNIQUE INDEX users_email ON users (email);
CREATE UNIQUE INDEX users_oauth ON users (oauth_provider, oauth_subject);

CREATE TABLE user_sessions (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    token_hash  TEXT NOT NULL,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    user_agent  TEXT NOT NULL DEFAULT '',
    ip_address  TEXT NOT NULL DEFAULT ''
);
CREATE UNIQUE INDEX user_sessions_token_hash ON user_sessions (token_hash);
CREATE INDEX user_sessions_expires_at ON user_sessions (expires_at);

CREATE TABLE items (
    id              TEXT PRIMARY KEY,
    owner_id        TEXT NOT NULL REFERENCES users (id),
    title           TEXT NOT NULL,
    creator         TEXT NOT NULL DEFAULT '',
    item_type       TEXT NOT NULL,
    release_year    INTEGER,
    page_count      INTEGER,
    current_page    INTEGER,
    isbn13          TEXT NOT NULL DEFAULT '',
    isbn10          TEXT NOT NULL DEFAULT '',
    description     TEXT NOT NULL DEFAULT '',
    cover_image     TEXT NOT NULL DEFAULT '',
    format          TEXT NOT NULL DEFAULT '',
    genre           TEXT NOT NULL DEFAULT '',
    rating          INTEGER,
    retail_price    REAL,
    volume_id       TEXT NOT NULL DEFAULT '',
    reading_status  TEXT,
    read_at         TEXT,
    series_name     TEXT NOT NULL DEFAULT '',
    series_volume   INTEGER,
    series_total    INTEGER,
    platform        TEXT NOT NULL DEFAULT '',
    age_group       TEXT NOT NULL DEFAULT '',
    player_count    TEXT NOT NULL DEFAULT '',
    notes           TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX items_owner ON items (owner_id);
CREATE INDEX items_series ON items (owner_id, series_name);

CREATE TABLE shelves (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users (id),
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    photo       TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX shelves_owner ON shelves (owner_id);
CREATE UNIQUE INDEX shelves_owner_name ON shelves (owner_id, name);

CREATE TABLE shelf_rows (
    id         TEXT PRIMARY KEY,
    shelf_id   TEXT NOT NULL REFERENCES shelves (id) ON DELETE CASCADE,
    row_index  INTEGER NOT NULL,
    y_start    REAL NOT NULL,
    y_end      REAL NOT NULL,
    UNIQUE (shelf_id, row_index)
);

CREATE TABLE shelf_columns (
    id         TEXT PRIMARY KEY,
    row_id     TEXT NOT NULL REFERENCES shelf_rows (id) ON DELETE CASCADE,
    col_index  INTEGER NOT NULL,
    x_start    REAL NOT NULL,
    x_end      REAL NOT NULL,
    UNIQUE (row_id, col_index)
);

CREATE TABLE shelf_slots (
    id         TEXT PRIMARY KEY,
    shelf_id   TEXT NOT NULL REFERENCES shelves (id) ON DELETE CASCADE,
    row_id     TEXT NOT NULL REFERENCES shelf_rows (id) ON DELETE CASCADE,
    column_id  TEXT NOT NULL REFERENCES shelf_columns (id) ON DELETE CASCADE,
    row_index  INTEGER NOT NULL,
    col_index  INTEGER NOT NULL,
    x_start    REAL NOT NULL,
    x_end      REAL NOT NULL,
    y_start    REAL NOT NULL,
    y_end      REAL NOT NULL,
    UNIQUE (shelf_id, row_index, col_index)
);

CREATE TABLE item_shelf_locations (
    id             TEXT PRIMARY KEY,
    item_id        TEXT NOT NULL REFERENCES items (id) ON DELETE CASCADE,
    shelf_id       TEXT NOT NULL REFERENCES shelves (id) ON DELETE CASCADE,
    shelf_slot_id  TEXT REFERENCES shelf_slots (id),
    created_at     TEXT NOT NULL,
    UNIQUE (shelf_id, item_id)
);
CREATE INDEX item_shelf_locations_slot ON item_shelf_locations (shelf_slot_id);
"#;

/// Apply pending migrations. Safe to call on every open.
pub fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(storage)?;

    if version < 1 {
        conn.execute_batch(MIGRATION_V1).map_err(storage)?;
    }

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(storage)?;
        tracing::info!(from = version, to = SCHEMA_VERSION, "migrated database schema");
    }
    Ok(())
}
