//! Item service: validation, reading-status transitions, and owner-scoped
//! catalog queries.

pub mod validate;

use std::collections::BTreeMap;

use anthology_common::{Error, Item, ItemDraft, ItemFilter, ItemId, Result, UserId};
use anthology_store::{items, Db};
use chrono::Utc;

use validate::{apply_status_rules, validate_draft};

#[derive(Debug, Clone, Default)]
pub struct ItemService;

impl ItemService {
    pub fn new() -> Self {
        ItemService
    }

    pub fn create(&self, db: &mut Db, owner: UserId, mut draft: ItemDraft) -> Result<Item> {
        let now = Utc::now();
        normalize_draft(&mut draft);
        validate_draft(&draft)?;
        apply_status_rules(&mut draft, now)?;
        let item = items::insert(db.conn(), owner, &draft, now)?;
        tracing::debug!(item = %item.id, kind = %item.item_type, "created item");
        Ok(item)
    }

    pub fn update(
        &self,
        db: &mut Db,
        owner: UserId,
        id: ItemId,
        mut draft: ItemDraft,
    ) -> Result<Item> {
        let now = Utc::now();
        normalize_draft(&mut draft);
        validate_draft(&draft)?;
        apply_status_rules(&mut draft, now)?;
        items::update(db.conn(), owner, id, &draft, now)
    }

    pub fn delete(&self, db: &mut Db, owner: UserId, id: ItemId) -> Result<()> {
        items::delete(db.conn(), owner, id)
    }

    pub fn get(&self, db: &mut Db, owner: UserId, id: ItemId) -> Result<Item> {
        items::get(db.conn(), owner, id)
    }

    pub fn list(&self, db: &mut Db, owner: UserId, filter: &ItemFilter) -> Result<Vec<Item>> {
        if let Some(letter) = filter.letter {
            if letter != '#' && !letter.is_ascii_alphabetic() {
                return Err(Error::validation(format!(
                    "letter filter must be A-Z or '#', got {letter:?}"
                )));
            }
        }
        items::list(db.conn(), owner, filter)
    }

    /// Letter → count map over the filter minus its letter, used to render
    /// the navigation rail.
    pub fn letter_histogram(
        &self,
        db: &mut Db,
        owner: UserId,
        filter: &ItemFilter,
    ) -> Result<BTreeMap<char, u64>> {
        items::letter_histogram(db.conn(), owner, &filter.without_letter())
    }

    pub fn series(&self, db: &mut Db, owner: UserId, series_name: &str) -> Result<Vec<Item>> {
        let series_name = series_name.trim();
        if series_name.is_empty() {
            return Err(Error::validation("series name is required"));
        }
        items::list_series(db.conn(), owner, series_name)
    }

    /// Pre-flight duplicate probe: returns the matching field name, if any,
    /// in the canonical order title → isbn13 → isbn10.
    pub fn check_duplicate(
        &self,
        db: &mut Db,
        owner: UserId,
        title: &str,
        isbn13: &str,
        isbn10: &str,
    ) -> Result<Option<&'static str>> {
        let mut tracker = crate::import::dedup::DuplicateTracker::new();
        tracker.seed(items::dedup_sources(db.conn(), owner)?.iter());
        Ok(tracker.probe(title, isbn13, isbn10))
    }
}

fn normalize_draft(draft: &mut ItemDraft) {
    draft.title = draft.title.trim().to_string();
    draft.creator = draft.creator.trim().to_string();
    draft.series_name = draft.series_name.trim().to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthology_common::ItemType;
    use anthology_store::users;
    use anthology_common::user::User;
    use chrono::Utc;

    fn setup() -> (ItemService, Db, UserId) {
        let db = Db::open_in_memory().unwrap();
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: "svc@example.com".to_string(),
            display_name: String::new(),
            avatar_url: String::new(),
            oauth_provider: "google".to_string(),
            oauth_subject: "svc".to_string(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        users::insert(db.conn(), &user).unwrap();
        (ItemService::new(), db, user.id)
    }

    #[test]
    fn test_create_trims_title() {
        let (service, mut db, owner) = setup();
        let item = service
            .create(
                &mut db,
                owner,
                ItemDraft {
                    title: "  Hyperion  ".to_string(),
                    item_type: ItemType::Book,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(item.title, "Hyperion");
    }

    #[test]
    fn test_create_rejects_empty_title() {
        let (service, mut db, owner) = setup();
        let err = service
            .create(
                &mut db,
                owner,
                ItemDraft {
                    title: "   ".to_string(),
                    item_type: ItemType::Book,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn test_bad_letter_filter() {
        let (service, mut db, owner) = setup();
        let filter = ItemFilter {
            letter: Some('?'),
            ..Default::default()
        };
        assert!(service.list(&mut db, owner, &filter).is_err());
    }

    #[test]
    fn test_check_duplicate_orders_fields() {
        let (service, mut db, owner) = setup();
        service
            .create(
                &mut db,
                owner,
                ItemDraft {
                    title: "Known".to_string(),
                    item_type: ItemType::Book,
                    isbn13: "9780000000001".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        // Matches both title and isbn13; title is canonical.
        assert_eq!(
            service
                .check_duplicate(&mut db, owner, "known", "9780000000001", "")
                .unwrap(),
            Some("title")
        );
        assert_eq!(
            service
                .check_duplicate(&mut db, owner, "Other", "978-0-00-000000-1", "")
                .unwrap(),
            Some("isbn13")
        );
        assert_eq!(
            service.check_duplicate(&mut db, owner, "Other", "", "").unwrap(),
            None
        );
    }
}
