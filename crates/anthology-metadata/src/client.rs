//! The blocking metadata client and its lookup trait seam.

use std::time::Duration;

use crate::error::MetadataError;
use crate::isbn::{self, QueryRoute};
use crate::model::{Metadata, VolumesResponse};
use crate::normalize::normalize_volume;

const MIN_QUERY_CHARS: usize = 3;
const ISBN_MAX_RESULTS: u8 = 1;
const KEYWORD_MAX_RESULTS: u8 = 5;

/// Lookup categories mirror the catalog's item types; only books have an
/// upstream today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Book,
    Game,
    Movie,
    Music,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Book => "book",
            Category::Game => "game",
            Category::Movie => "movie",
            Category::Music => "music",
        }
    }
}

/// Seam the importer (and tests) depend on instead of the concrete client.
pub trait MetadataLookup {
    fn lookup(&self, query: &str, category: Category) -> Result<Vec<Metadata>, MetadataError>;
}

/// A fully resolved request: route plus result cap. Planning is pure and
/// happens before any network traffic, so malformed barcodes and invalid
/// queries never reach the upstream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LookupPlan {
    pub route: QueryRoute,
    pub max_results: u8,
}

pub(crate) fn plan(query: &str, category: Category) -> Result<LookupPlan, MetadataError> {
    if category != Category::Book {
        return Err(MetadataError::UnsupportedCategory(
            category.as_str().to_string(),
        ));
    }
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_CHARS {
        return Err(MetadataError::InvalidQuery(format!(
            "query must be at least {MIN_QUERY_CHARS} characters"
        )));
    }
    match isbn::route(trimmed) {
        QueryRoute::Malformed => Err(MetadataError::NotFound),
        route @ QueryRoute::Isbn(_) => Ok(LookupPlan {
            route,
            max_results: ISBN_MAX_RESULTS,
        }),
        route @ QueryRoute::Keyword(_) => Ok(LookupPlan {
            route,
            max_results: KEYWORD_MAX_RESULTS,
        }),
    }
}

/// Blocking client against the volumes API.
pub struct MetadataClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl MetadataClient {
    /// `base_url` without a trailing slash, e.g.
    /// `https://www.googleapis.com/books/v1`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MetadataError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(MetadataClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn fetch(&self, plan: &LookupPlan) -> Result<Vec<Metadata>, MetadataError> {
        let q = match &plan.route {
            QueryRoute::Isbn(identifier) => format!("isbn:{identifier}"),
            QueryRoute::Keyword(text) => text.clone(),
            QueryRoute::Malformed => unreachable!("malformed queries never reach fetch"),
        };
        let direct = matches!(plan.route, QueryRoute::Isbn(_));

        let max_results = plan.max_results.to_string();
        let response = self
            .http
            .get(format!("{}/volumes", self.base_url))
            .query(&[("q", q.as_str()), ("maxResults", max_results.as_str())])
            .send()?;

        let status = response.status();
        if status.as_u16() == 404 && direct {
            return Err(MetadataError::NotFound);
        }
        if !status.is_success() {
            return Err(MetadataError::UpstreamStatus(status.as_u16()));
        }

        let body = response.text()?;
        let decoded: VolumesResponse =
            serde_json::from_str(&body).map_err(|e| MetadataError::Decode(e.to_string()))?;

        let results: Vec<Metadata> = decoded
            .items
            .iter()
            .filter_map(|volume| normalize_volume(volume, &plan.route))
            .take(plan.max_results as usize)
            .collect();
        tracing::debug!(
            direct,
            results = results.len(),
            "metadata lookup completed"
        );
        Ok(results)
    }
}

impl MetadataLookup for MetadataClient {
    fn lookup(&self, query: &str, category: Category) -> Result<Vec<Metadata>, MetadataError> {
        let plan = plan(query, category)?;
        self.fetch(&plan)
    }
}
