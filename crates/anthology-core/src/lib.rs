//! Anthology core services.
//!
//! Semantic invariants live here: geometric validation for shelf layouts,
//! item field rules and reading-status transitions, session token handling,
//! OAuth claim ingestion, and the CSV import/export pipelines. Services take
//! the owner id as an explicit first argument and thread it into every
//! repository call; there is no ambient caller state.

pub mod export;
pub mod guard;
pub mod identity;
pub mod import;
pub mod item;
pub mod logging;
pub mod session;
pub mod shelf;

pub use guard::AccessGuard;
pub use identity::{IdentityService, OAuthClaims};
pub use import::{CsvImporter, ImportSummary};
pub use item::ItemService;
pub use session::{IssuedSession, SessionService};
pub use shelf::{LayoutChange, ShelfService};
