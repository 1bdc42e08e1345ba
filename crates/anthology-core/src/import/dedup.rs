//! In-session duplicate tracking.
//!
//! One flat key set covers the three duplicate dimensions; keys are
//! `"<field>:<normalized value>"` so probes stay O(1) and the summary reason
//! string falls straight out of the matching field. Titles normalize by
//! lowercasing and trimming, ISBNs by stripping everything but digits.

use std::collections::HashSet;

use anthology_metadata::isbn::digits_only;
use anthology_store::items::DedupSource;

/// Fields checked in canonical order; the first match names the reason.
const FIELDS: [&str; 3] = ["title", "isbn13", "isbn10"];

#[derive(Debug, Default)]
pub struct DuplicateTracker {
    keys: HashSet<String>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        DuplicateTracker::default()
    }

    /// Seed from the owner's existing catalog.
    pub fn seed<'a>(&mut self, sources: impl Iterator<Item = &'a DedupSource>) {
        for source in sources {
            self.insert(&source.title, &source.isbn13, &source.isbn10);
        }
    }

    /// Returns the first matching field name, or `None` when the candidate
    /// is new.
    pub fn probe(&self, title: &str, isbn13: &str, isbn10: &str) -> Option<&'static str> {
        for (field, key) in FIELDS.iter().zip(keys(title, isbn13, isbn10)) {
            if let Some(key) = key {
                if self.keys.contains(&key) {
                    return Some(field);
                }
            }
        }
        None
    }

    /// Record a candidate so later rows in the same upload dedup against it.
    pub fn insert(&mut self, title: &str, isbn13: &str, isbn10: &str) {
        for key in keys(title, isbn13, isbn10).into_iter().flatten() {
            self.keys.insert(key);
        }
    }
}

fn keys(title: &str, isbn13: &str, isbn10: &str) -> [Option<String>; 3] {
    let title = title.trim().to_lowercase();
    let isbn13 = digits_only(isbn13);
    let isbn10 = digits_only(isbn10);
    [
        (!title.is_empty()).then(|| format!("title:{title}")),
        (!isbn13.is_empty()).then(|| format!("isbn13:{isbn13}")),
        (!isbn10.is_empty()).then(|| format!("isbn10:{isbn10}")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_normalization() {
        let mut tracker = DuplicateTracker::new();
        tracker.insert("  The Hobbit ", "", "");
        assert_eq!(tracker.probe("the hobbit", "", ""), Some("title"));
        assert_eq!(tracker.probe("THE HOBBIT  ", "", ""), Some("title"));
        assert_eq!(tracker.probe("The Hobbit 2", "", ""), None);
    }

    #[test]
    fn test_isbn_normalization_strips_non_digits() {
        let mut tracker = DuplicateTracker::new();
        tracker.insert("", "978-0-441-17271-9", "0-441-17271-7");
        assert_eq!(tracker.probe("", "9780441172719", ""), Some("isbn13"));
        assert_eq!(tracker.probe("", "", "0441172717"), Some("isbn10"));
    }

    #[test]
    fn test_field_order_is_title_first() {
        let mut tracker = DuplicateTracker::new();
        tracker.insert("Dune", "9780441172719", "");
        // Matching both dimensions reports the title.
        assert_eq!(
            tracker.probe("dune", "9780441172719", ""),
            Some("title")
        );
    }

    #[test]
    fn test_empty_values_never_match() {
        let mut tracker = DuplicateTracker::new();
        tracker.insert("", "", "");
        assert_eq!(tracker.probe("", "", ""), None);
        assert_eq!(tracker.probe("anything", "", ""), None);
    }

    #[test]
    fn test_seed_from_sources() {
        let sources = vec![DedupSource {
            title: "Existing".to_string(),
            isbn13: "9780000000001".to_string(),
            isbn10: String::new(),
        }];
        let mut tracker = DuplicateTracker::new();
        tracker.seed(sources.iter());
        assert_eq!(tracker.probe("existing", "", ""), Some("title"));
        assert_eq!(tracker.probe("new", "9780000000001", ""), Some("isbn13"));
    }
}
