//! Shaping upstream volumes into [`Metadata`] records.

use std::sync::OnceLock;

use regex::Regex;

use crate::isbn::{self, QueryRoute};
use crate::model::{Metadata, Volume};

/// Priority-ordered genre rules, specific before broad. The first
/// category+keyword match wins; no match yields an empty genre.
const GENRE_RULES: &[(&str, &[&str])] = &[
    ("Biography", &["biography", "autobiography", "memoir"]),
    ("Children's", &["juvenile", "children"]),
    ("History", &["history", "historical"]),
    (
        "Science & Technology",
        &["science", "technology", "computers", "mathematics", "engineering", "medical"],
    ),
    (
        "Arts & Entertainment",
        &["art", "music", "photography", "performing arts", "games", "design"],
    ),
    (
        "Fiction",
        &["fiction", "novel", "fantasy", "mystery", "thriller", "romance", "poetry", "comics"],
    ),
    (
        "Non-Fiction",
        &["nonfiction", "business", "self-help", "philosophy", "religion", "travel", "cooking"],
    ),
    ("Reference", &["reference", "education", "study aids", "language"]),
];

/// Map upstream categories through the priority rules.
///
/// Single-word keywords match whole whitespace-separated tokens so that
/// "fiction" does not hit "Nonfiction"; multi-word keywords match as
/// substrings.
pub fn map_genre(categories: &[String]) -> String {
    for (genre, keywords) in GENRE_RULES {
        for category in categories {
            let lowered = category.to_lowercase();
            for keyword in *keywords {
                let hit = if keyword.contains(' ') {
                    lowered.contains(keyword)
                } else {
                    lowered.split_whitespace().any(|token| {
                        token == *keyword || token.trim_matches(|c: char| !c.is_alphanumeric()) == *keyword
                    })
                };
                if hit {
                    return (*genre).to_string();
                }
            }
        }
    }
    String::new()
}

/// First four-digit year in `[1000, 2099]` found in the publish date string.
pub fn scan_year(published_date: &str) -> Option<i32> {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let re = YEAR.get_or_init(|| Regex::new(r"(1[0-9]{3}|20[0-9]{2})").expect("year pattern"));
    re.find(published_date)
        .and_then(|m| m.as_str().parse().ok())
}

/// First non-empty image URL, with a plain-http prefix rewritten to https.
fn pick_cover(volume: &Volume) -> String {
    let links = &volume.volume_info.image_links;
    let first = [
        &links.thumbnail,
        &links.small_thumbnail,
        &links.small,
        &links.medium,
        &links.large,
        &links.extra_large,
    ]
    .into_iter()
    .find(|url| !url.is_empty());
    match first {
        Some(url) => {
            if let Some(rest) = url.strip_prefix("http://") {
                format!("https://{rest}")
            } else {
                url.clone()
            }
        }
        None => String::new(),
    }
}

/// Shape one upstream volume into a [`Metadata`] record. Returns `None` for
/// records with neither a title nor a creator. `route` is the original query
/// routing, used as an ISBN fallback when the upstream omits an identifier
/// of the matching length.
pub fn normalize_volume(volume: &Volume, route: &QueryRoute) -> Option<Metadata> {
    let info = &volume.volume_info;
    let title = info.title.trim().to_string();
    let creator = info.authors.join(", ").trim().to_string();
    if title.is_empty() && creator.is_empty() {
        return None;
    }

    let mut isbn13 = String::new();
    let mut isbn10 = String::new();
    for identifier in &info.industry_identifiers {
        match identifier.kind.as_str() {
            "ISBN_13" if isbn13.is_empty() => isbn13 = isbn::digits_only(&identifier.identifier),
            "ISBN_10" if isbn10.is_empty() => {
                isbn10 = isbn::normalize_identifier(&identifier.identifier)
            }
            _ => {}
        }
    }
    if let QueryRoute::Isbn(queried) = route {
        if isbn13.is_empty() && isbn::is_isbn13(queried) {
            isbn13 = queried.clone();
        }
        if isbn10.is_empty() && isbn::is_isbn10(queried) {
            isbn10 = queried.clone();
        }
    }

    let description = if !info.description.is_empty() {
        info.description.clone()
    } else {
        info.subtitle.clone()
    };

    let retail_price = volume
        .sale_info
        .retail_price
        .as_ref()
        .filter(|price| price.currency_code == "USD")
        .map(|price| price.amount);

    Some(Metadata {
        title,
        creator,
        isbn13,
        isbn10,
        description,
        cover_image: pick_cover(volume),
        release_year: scan_year(&info.published_date),
        genre: map_genre(&info.categories),
        retail_price,
        page_count: info.page_count,
        volume_id: volume.id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageLinks, IndustryIdentifier, Price, SaleInfo, VolumeInfo};

    fn volume(info: VolumeInfo) -> Volume {
        Volume {
            id: "vol-1".to_string(),
            volume_info: info,
            sale_info: SaleInfo::default(),
        }
    }

    #[test]
    fn test_empty_title_and_creator_skipped() {
        let v = volume(VolumeInfo::default());
        assert!(normalize_volume(&v, &QueryRoute::Keyword("x".into())).is_none());
    }

    #[test]
    fn test_creator_alone_keeps_record() {
        let v = volume(VolumeInfo {
            authors: vec!["Anonymous".to_string()],
            ..Default::default()
        });
        let meta = normalize_volume(&v, &QueryRoute::Keyword("x".into())).unwrap();
        assert_eq!(meta.creator, "Anonymous");
        assert_eq!(meta.title, "");
    }

    #[test]
    fn test_isbn_fallback_from_query() {
        let v = volume(VolumeInfo {
            title: "Sparse".to_string(),
            ..Default::default()
        });
        let meta =
            normalize_volume(&v, &QueryRoute::Isbn("9780000000002".to_string())).unwrap();
        assert_eq!(meta.isbn13, "9780000000002");
        assert_eq!(meta.isbn10, "");

        let meta = normalize_volume(&v, &QueryRoute::Isbn("030640615X".to_string())).unwrap();
        assert_eq!(meta.isbn10, "030640615X");
        assert_eq!(meta.isbn13, "");
    }

    #[test]
    fn test_upstream_identifiers_win_over_query() {
        let v = volume(VolumeInfo {
            title: "Full".to_string(),
            industry_identifiers: vec![IndustryIdentifier {
                kind: "ISBN_13".to_string(),
                identifier: "978-0-441-17271-9".to_string(),
            }],
            ..Default::default()
        });
        let meta =
            normalize_volume(&v, &QueryRoute::Isbn("9999999999999".to_string())).unwrap();
        assert_eq!(meta.isbn13, "9780441172719");
    }

    #[test]
    fn test_description_falls_back_to_subtitle() {
        let v = volume(VolumeInfo {
            title: "T".to_string(),
            subtitle: "A subtitle".to_string(),
            ..Default::default()
        });
        let meta = normalize_volume(&v, &QueryRoute::Keyword("t".into())).unwrap();
        assert_eq!(meta.description, "A subtitle");
    }

    #[test]
    fn test_cover_https_rewrite() {
        let v = volume(VolumeInfo {
            title: "T".to_string(),
            image_links: ImageLinks {
                thumbnail: "http://books.example/cover.jpg".to_string(),
                ..Default::default()
            },
            ..Default::default()
        });
        let meta = normalize_volume(&v, &QueryRoute::Keyword("t".into())).unwrap();
        assert_eq!(meta.cover_image, "https://books.example/cover.jpg");
    }

    #[test]
    fn test_year_scan() {
        assert_eq!(scan_year("1965-08-01"), Some(1965));
        assert_eq!(scan_year("published circa 2003"), Some(2003));
        assert_eq!(scan_year("08-2019"), Some(2019));
        assert_eq!(scan_year("n.d."), None);
        assert_eq!(scan_year("0999"), None);
        assert_eq!(scan_year("2150"), None);
    }

    #[test]
    fn test_genre_priority_order() {
        // Biography beats history even when both match.
        assert_eq!(
            map_genre(&["Historical Biography".to_string()]),
            "Biography"
        );
        assert_eq!(map_genre(&["Juvenile Fiction".to_string()]), "Children's");
        assert_eq!(map_genre(&["Epic Fantasy".to_string()]), "Fiction");
    }

    #[test]
    fn test_genre_no_match_is_empty() {
        assert_eq!(map_genre(&["Quilting".to_string()]), "");
        assert_eq!(map_genre(&[]), "");
    }

    #[test]
    fn test_fiction_keyword_does_not_hit_nonfiction() {
        assert_eq!(map_genre(&["Nonfiction".to_string()]), "Non-Fiction");
    }

    #[test]
    fn test_usd_price_only() {
        let mut v = volume(VolumeInfo {
            title: "Priced".to_string(),
            ..Default::default()
        });
        v.sale_info = SaleInfo {
            retail_price: Some(Price {
                amount: 12.5,
                currency_code: "EUR".to_string(),
            }),
        };
        let meta = normalize_volume(&v, &QueryRoute::Keyword("p".into())).unwrap();
        assert_eq!(meta.retail_price, None);

        v.sale_info.retail_price = Some(Price {
            amount: 12.5,
            currency_code: "USD".to_string(),
        });
        let meta = normalize_volume(&v, &QueryRoute::Keyword("p".into())).unwrap();
        assert_eq!(meta.retail_price, Some(12.5));
    }
}
