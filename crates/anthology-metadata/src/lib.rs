//! Anthology book metadata client.
//!
//! A thin query-and-decode layer over an external volume catalog. Queries
//! route three ways before any network traffic: normalized 10/13-digit
//! identifiers become direct ISBN lookups, digit-ish strings of any other
//! length are malformed barcodes answered locally with not-found, and
//! everything else becomes a keyword search. Upstream records are shaped
//! into a common [`Metadata`] struct with conservative normalization rules.

pub mod client;
pub mod error;
pub mod isbn;
pub mod model;
pub mod normalize;

pub use client::{Category, MetadataClient, MetadataLookup};
pub use error::MetadataError;
pub use isbn::QueryRoute;
pub use model::Metadata;
