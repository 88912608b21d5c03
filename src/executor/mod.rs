//! Search executor: the seam between query construction and the document
//! index.
//!
//! [`SearchBackend`] is the injected adapter object: constructed at process
//! start, passed in explicitly, never referenced as ambient global state.
//! Requests and responses are typed; each backend renders them into its own
//! wire format. [`elastic::ElasticBackend`] talks to an Elasticsearch
//! cluster over HTTP; [`memory::MemoryBackend`] evaluates the same
//! semantics in process and backs the integration suite.

pub mod elastic;
pub mod memory;
pub mod scripts;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::ProductDocument;
use crate::error::Result;
use crate::params::SortSpec;
use crate::query::{FilterClause, FullTextQuery};
use scripts::{DocSelector, UpdateScript};

/// What a search request matches on.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// Boolean filter clauses, implicit AND. An empty list matches all.
    Filtered(Vec<FilterClause>),
    /// Free-text relevance query over the full-text fields.
    FullText(FullTextQuery),
}

/// A paginated, sorted search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub kind: QueryKind,
    pub sort: SortSpec,
    /// Offset of the first hit.
    pub from: usize,
    /// Page size.
    pub size: usize,
}

/// One search hit: document id plus the stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub document: ProductDocument,
}

/// One page of hits with the total match count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

/// Min/max statistics over a numeric facet. Empty when no document matched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

/// One string-facet value with its document count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueBucket {
    pub pk: i64,
    pub name: String,
    pub count: u64,
}

/// Aggregated values of one string facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringFacetBucket {
    pub pk: i64,
    pub slug: String,
    pub name: String,
    pub values: Vec<ValueBucket>,
}

/// Aggregated statistics of one numeric facet.
///
/// `stats` covers documents matching the current filter set; `total_stats`
/// covers the entire catalog slice, so a range-slider UI can show selectable
/// bounds versus the bounds implied by the user's other selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberFacetBucket {
    pub pk: i64,
    pub slug: String,
    pub name: String,
    pub suffix: Option<String>,
    pub stats: Stats,
    pub total_stats: Stats,
}

/// The combined facet aggregation result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FacetAggregations {
    pub string_facets: Vec<StringFacetBucket>,
    pub number_facets: Vec<NumberFacetBucket>,
}

/// One category present in the index, with a capped facet preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBucket {
    pub pk: i64,
    pub name: String,
    pub slug: String,
    pub count: u64,
    pub sfacets: Vec<StringFacetBucket>,
}

/// Size caps for facet aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationCaps {
    /// Maximum facet attributes.
    pub facet_limit: usize,
    /// Maximum values per attribute.
    pub value_limit: usize,
}

/// Outcome of a scripted update-by-query.
///
/// Version conflicts are a benign race with a concurrent mutation: counted,
/// never escalated to a request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub updated: u64,
    pub conflicts: u64,
}

impl UpdateOutcome {
    /// Merge outcomes from a batch of updates.
    pub fn merge(self, other: UpdateOutcome) -> UpdateOutcome {
        UpdateOutcome {
            updated: self.updated + other.updated,
            conflicts: self.conflicts + other.conflicts,
        }
    }
}

/// Adapter to the document index.
///
/// All operations are thin: query construction happens before the call,
/// result shaping after. Transport failures surface as retryable errors;
/// this layer does not retry internally.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Point lookup by document id. `Ok(None)` means the document does not
    /// exist, which is distinct from an empty search result.
    async fn get(&self, id: &str) -> Result<Option<ProductDocument>>;

    /// Paginated, sorted search.
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage>;

    /// All documents of one product family (term match on the family pk).
    async fn search_family(&self, family_pk: i64) -> Result<Vec<SearchHit>>;

    /// String-facet buckets and numeric stats for the filtered document set,
    /// plus unfiltered (`total`) numeric stats.
    async fn facet_aggregations(
        &self,
        clauses: &[FilterClause],
        caps: AggregationCaps,
    ) -> Result<FacetAggregations>;

    /// Value buckets of a single string facet over the given (already
    /// exclusion-filtered) clause set. Also serves full enumeration when
    /// `size` is uncapped.
    async fn sibling_aggregation(
        &self,
        clauses: &[FilterClause],
        slug: &str,
        size: usize,
    ) -> Result<Vec<ValueBucket>>;

    /// One bucket per distinct category, each with a capped facet preview.
    async fn category_aggregations(&self, facet_preview: usize) -> Result<Vec<CategoryBucket>>;

    /// Deduplicated prefix completions.
    async fn suggest(&self, prefix: &str, size: usize) -> Result<Vec<String>>;

    /// Full replace of one document, keyed by variant pk. Idempotent.
    async fn index_document(&self, document: &ProductDocument) -> Result<()>;

    /// Full replaces in chunks of `chunk_size` documents. Each write is
    /// keyed by document id, so the whole operation is safe to retry.
    async fn bulk_index(&self, documents: &[ProductDocument], chunk_size: usize) -> Result<()>;

    /// Delete one document. Returns whether it existed.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    /// Scripted partial update of every document matching the script's
    /// selector, proceeding past version conflicts.
    async fn update_by_query(&self, script: &UpdateScript) -> Result<UpdateOutcome>;

    /// Delete every document matching the selector. Returns the count.
    async fn delete_by_query(&self, selector: &DocSelector) -> Result<u64>;
}
