//! Connection handling and column codec helpers.

use std::path::Path;

use anthology_common::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use uuid::Uuid;

use crate::schema;

/// A single database handle. Handles are cheap to open; parallel request
/// handlers each hold their own on the same file and coordinate through
/// SQLite's WAL + busy timeout.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open (creating if needed) the database at `path` and apply pending
    /// migrations.
    pub fn open(path: &Path, busy_timeout_ms: u64) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(storage)?;
        Self::init(conn, busy_timeout_ms)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::init(conn, 5_000)
    }

    fn init(conn: Connection, busy_timeout_ms: u64) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON").map_err(storage)?;
        conn.pragma_update(None, "busy_timeout", busy_timeout_ms as i64)
            .map_err(storage)?;
        schema::migrate(&conn)?;
        Ok(Db { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Begin an immediate write transaction, serializing against other
    /// writers up front.
    pub fn immediate_tx(&mut self) -> Result<rusqlite::Transaction<'_>> {
        self.conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(storage)
    }
}

/// Commit a transaction started with [`Db::immediate_tx`].
pub fn commit(tx: rusqlite::Transaction<'_>) -> Result<()> {
    tx.commit().map_err(storage)
}

/// Map any rusqlite error into the storage kind.
pub(crate) fn storage(err: rusqlite::Error) -> Error {
    Error::storage(err.to_string())
}

/// True when `err` is a uniqueness-constraint violation, which call sites
/// translate into owner-facing conflicts.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Timestamps persist as fixed-width RFC 3339 with a +00:00 offset so that
/// lexicographic comparison in SQL matches chronological order.
pub(crate) fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub(crate) fn opt_ts(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(ts)
}

#[derive(Debug, thiserror::Error)]
#[error("column {column}: {message}")]
struct DecodeError {
    column: usize,
    message: String,
}

fn decode_err(column: usize, message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        Box::new(DecodeError {
            column,
            message: message.into(),
        }),
    )
}

pub(crate) fn parse_ts(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_err(column, format!("bad timestamp {raw:?}: {e}")))
}

pub(crate) fn parse_opt_ts(
    column: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(column, &s)).transpose()
}

pub(crate) fn parse_uuid(column: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| decode_err(column, format!("bad uuid {raw:?}: {e}")))
}
