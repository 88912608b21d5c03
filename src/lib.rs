//! # Vitrina
//!
//! Query construction and result shaping for a faceted product catalog
//! search, running against an Elasticsearch-compatible document index.
//!
//! ## Features
//!
//! - Typed filter construction: string facets, numeric ranges, tags,
//!   sales, collections, categories
//! - Facet aggregation with per-attribute sibling recomputation
//! - Catalog-to-document projection, one document per active variant
//! - Write-time sale price resolution and denormalization
//! - Typed scripted partial updates for renames, deletions, and
//!   membership changes
//! - An in-process backend with the same semantics as the cluster one

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod executor;
pub mod format;
pub mod params;
pub mod price;
pub mod query;

pub use catalog::CatalogSearch;
pub use config::{ElasticConfig, SearchConfig};
pub use error::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
