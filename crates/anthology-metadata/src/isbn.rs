//! ISBN normalization and query routing.
//!
//! A query that looks like a barcode (digits, X check characters, hyphens,
//! whitespace and nothing else) either normalizes to a 10- or 13-character
//! identifier or is malformed; malformed barcodes are answered locally
//! without an upstream call.

/// How a trimmed query should be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRoute {
    /// Direct identifier lookup, maxResults = 1. Carries the normalized
    /// identifier (digits, with a possible trailing `X` for ISBN-10).
    Isbn(String),
    /// Keyword search, maxResults = 5.
    Keyword(String),
    /// Barcode-shaped but not a 10/13-length identifier (e.g. a 12-digit
    /// UPC). Answered with not-found locally.
    Malformed,
}

/// True when every character could belong to a written-out ISBN.
fn is_barcode_shaped(query: &str) -> bool {
    !query.is_empty()
        && query
            .chars()
            .all(|c| c.is_ascii_digit() || c == 'x' || c == 'X' || c == '-' || c.is_whitespace())
}

/// Strip separators and fold the check character to uppercase.
pub fn normalize_identifier(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'x' || *c == 'X')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// True for a 13-digit identifier.
pub fn is_isbn13(normalized: &str) -> bool {
    normalized.len() == 13 && normalized.chars().all(|c| c.is_ascii_digit())
}

/// True for a 10-character identifier: nine digits plus a digit or `X`
/// check character in the final position.
pub fn is_isbn10(normalized: &str) -> bool {
    normalized.len() == 10
        && normalized[..9].chars().all(|c| c.is_ascii_digit())
        && normalized[9..]
            .chars()
            .all(|c| c.is_ascii_digit() || c == 'X')
}

/// Digits-only projection used by duplicate keys.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Route a trimmed query. Callers enforce the minimum length beforehand.
pub fn route(query: &str) -> QueryRoute {
    if !is_barcode_shaped(query) {
        return QueryRoute::Keyword(query.to_string());
    }
    let normalized = normalize_identifier(query);
    if is_isbn13(&normalized) || is_isbn10(&normalized) {
        QueryRoute::Isbn(normalized)
    } else {
        QueryRoute::Malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn13_routes_direct() {
        assert_eq!(route("9780441172719"), QueryRoute::Isbn("9780441172719".into()));
        assert_eq!(
            route("978-0-441-17271-9"),
            QueryRoute::Isbn("9780441172719".into())
        );
    }

    #[test]
    fn test_isbn10_with_check_x() {
        assert_eq!(route("030640615x"), QueryRoute::Isbn("030640615X".into()));
        assert_eq!(route("0-306-40615-X"), QueryRoute::Isbn("030640615X".into()));
    }

    #[test]
    fn test_x_only_valid_in_final_position() {
        // X before position 10 keeps it from being an identifier; it is still
        // barcode-shaped, so the query is malformed.
        assert_eq!(route("03064X6150"), QueryRoute::Malformed);
    }

    #[test]
    fn test_upc_length_is_malformed() {
        assert_eq!(route("123456789012"), QueryRoute::Malformed);
        assert_eq!(route("12345"), QueryRoute::Malformed);
    }

    #[test]
    fn test_text_routes_keyword() {
        assert_eq!(route("dune herbert"), QueryRoute::Keyword("dune herbert".into()));
        // A digit-containing title is still a keyword search.
        assert_eq!(route("catch 22"), QueryRoute::Keyword("catch 22".into()));
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("978-0-441-17271-9"), "9780441172719");
        assert_eq!(digits_only("030640615X"), "030640615");
        assert_eq!(digits_only(""), "");
    }
}
