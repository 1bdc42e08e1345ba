//! Anthology SQLite persistence.
//!
//! Storage-level invariants live here: owner scoping on every query, the
//! layout reconciler's transactional write order, uniqueness constraints,
//! and cascades. Semantic validation (geometry, item field rules) happens in
//! the service layer before these functions run.
//!
//! All multi-statement writes use immediate transactions, so concurrent
//! layout edits on the same database linearize; WAL mode keeps readers
//! unblocked meanwhile.

pub mod db;
pub mod items;
pub mod schema;
pub mod sessions;
pub mod shelves;
pub mod users;

pub use db::Db;
