//! In-memory reference backend.
//!
//! Evaluates the same filter, aggregation, and scripted-update semantics as
//! the Elasticsearch adapter directly against documents held in process.
//! Backs the integration suite and local development; it is not a general
//! search engine (full-text matching is word-wise containment, not scored).

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::document::ProductDocument;
use crate::error::Result;
use crate::executor::scripts::{DocSelector, ScriptOp, UpdateScript};
use crate::executor::{
    AggregationCaps, CategoryBucket, FacetAggregations, NumberFacetBucket, QueryKind,
    SearchBackend, SearchHit, SearchPage, SearchRequest, Stats, StringFacetBucket, UpdateOutcome,
    ValueBucket,
};
use crate::params::{SortOrder, SortSpec};
use crate::query::FilterClause;

/// Documents keyed by variant pk, behind a single lock.
#[derive(Default)]
pub struct MemoryBackend {
    docs: RwLock<BTreeMap<i64, ProductDocument>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    fn matching(&self, clauses: &[FilterClause]) -> Vec<(i64, ProductDocument)> {
        self.docs
            .read()
            .iter()
            .filter(|(_, doc)| clauses.iter().all(|clause| clause_matches(clause, doc)))
            .map(|(pk, doc)| (*pk, doc.clone()))
            .collect()
    }
}

/// Evaluate one filter clause against a document.
fn clause_matches(clause: &FilterClause, doc: &ProductDocument) -> bool {
    match clause {
        FilterClause::Category(slug) => doc.category.slug == *slug,
        FilterClause::Tag(pk) => doc.tags.iter().any(|tag| tag.pk == *pk),
        FilterClause::Sales(pks) => doc.variant.sales.iter().any(|sale| pks.contains(&sale.pk)),
        FilterClause::Collections(pks) => {
            doc.variant.collections.iter().any(|pk| pks.contains(pk))
        }
        FilterClause::StringFacet { slug, value_ids } => doc.string_facets.iter().any(|group| {
            group.slug == *slug && group.values.iter().any(|value| value_ids.contains(&value.pk))
        }),
        FilterClause::NumericFacet { slug, min, max } => doc
            .number_facets
            .iter()
            .any(|entry| entry.slug == *slug && *min <= entry.value && entry.value <= *max),
    }
}

/// Word-wise containment over the full-text fields, AND across words.
fn fulltext_matches(query: &str, doc: &ProductDocument) -> bool {
    let haystack = format!(
        "{} {} {} {} {}",
        doc.name, doc.manufacturer.name, doc.category.name, doc.fulltext_locale,
        doc.fulltext_phonetic
    )
    .to_lowercase();
    query
        .split_whitespace()
        .all(|word| haystack.contains(&word.to_lowercase()))
}

fn sort_hits(hits: &mut [(i64, ProductDocument)], sort: &SortSpec) {
    hits.sort_by(|(a_pk, a), (b_pk, b)| {
        let ordering = match sort.field.as_str() {
            "price" => a.variant.price.cmp(&b.variant.price),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
        .then(a_pk.cmp(b_pk));
        match sort.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn selector_matches(selector: &DocSelector, doc: &ProductDocument) -> bool {
    match selector {
        DocSelector::Family(pk) => doc.family_pk == *pk,
        DocSelector::Variant(pk) => doc.variant.pk == *pk,
        DocSelector::Variants(pks) => pks.contains(&doc.variant.pk),
        DocSelector::Category(pk) => doc.category.pk == *pk,
        DocSelector::Manufacturer(pk) => doc.manufacturer.pk == *pk,
        DocSelector::Tag(pk) => doc.tags.iter().any(|tag| tag.pk == *pk),
        DocSelector::StringFacet(pk) => doc.string_facets.iter().any(|group| group.pk == *pk),
        DocSelector::StringFacetValue { facet_pk, value_pk } => {
            doc.string_facets.iter().any(|group| {
                group.pk == *facet_pk && group.values.iter().any(|value| value.pk == *value_pk)
            })
        }
        DocSelector::NumberFacet(pk) => doc.number_facets.iter().any(|entry| entry.pk == *pk),
        DocSelector::Collection(pk) => doc.variant.collections.contains(pk),
    }
}

/// Apply a typed script mutation in place; mirrors the painless bodies.
fn apply_op(doc: &mut ProductDocument, op: &ScriptOp) {
    match op {
        ScriptOp::SetCategory(category) => doc.category = category.clone(),
        ScriptOp::SetManufacturer(manufacturer) => doc.manufacturer = manufacturer.clone(),
        ScriptOp::RenameTag(tag) => {
            for existing in doc.tags.iter_mut().filter(|t| t.pk == tag.pk) {
                *existing = tag.clone();
            }
        }
        ScriptOp::RemoveTag(pk) => doc.tags.retain(|tag| tag.pk != *pk),
        ScriptOp::RenameStringFacet(facet) => {
            for group in doc.string_facets.iter_mut().filter(|g| g.pk == facet.pk) {
                group.name = facet.name.clone();
                group.slug = facet.slug.clone();
            }
        }
        ScriptOp::RemoveStringFacet(pk) => doc.string_facets.retain(|group| group.pk != *pk),
        ScriptOp::RenameStringFacetValue { facet_pk, value } => {
            for group in doc.string_facets.iter_mut().filter(|g| g.pk == *facet_pk) {
                for existing in group.values.iter_mut().filter(|v| v.pk == value.pk) {
                    existing.name = value.name.clone();
                }
            }
        }
        ScriptOp::RemoveStringFacetValue { facet_pk, value_pk } => {
            for group in doc.string_facets.iter_mut().filter(|g| g.pk == *facet_pk) {
                group.values.retain(|value| value.pk != *value_pk);
            }
        }
        ScriptOp::RenameNumberFacet { facet, suffix } => {
            for entry in doc.number_facets.iter_mut().filter(|e| e.pk == facet.pk) {
                entry.name = facet.name.clone();
                entry.slug = facet.slug.clone();
                entry.suffix = suffix.clone();
            }
        }
        ScriptOp::RemoveNumberFacet(pk) => doc.number_facets.retain(|entry| entry.pk != *pk),
        ScriptOp::AddCollection(pk) => {
            if !doc.variant.collections.contains(pk) {
                doc.variant.collections.push(*pk);
            }
        }
        ScriptOp::RemoveCollection(pk) => doc.variant.collections.retain(|c| c != pk),
        ScriptOp::SetSales {
            sales,
            price,
            old_price,
        } => {
            doc.variant.sales = sales.clone();
            doc.variant.price = *price;
            doc.variant.old_price = *old_price;
        }
    }
}

/// Aggregate string facet buckets over a document set, attributes and values
/// ordered by key ascending, size-capped.
fn aggregate_string_facets(
    docs: &[(i64, ProductDocument)],
    facet_limit: usize,
    value_limit: usize,
) -> Vec<StringFacetBucket> {
    // slug -> (pk, name, value pk -> (name, count))
    let mut groups: BTreeMap<String, (i64, String, BTreeMap<i64, (String, u64)>)> =
        BTreeMap::new();
    for (_, doc) in docs {
        for group in &doc.string_facets {
            let entry = groups
                .entry(group.slug.clone())
                .or_insert_with(|| (group.pk, group.name.clone(), BTreeMap::new()));
            for value in &group.values {
                let bucket = entry
                    .2
                    .entry(value.pk)
                    .or_insert_with(|| (value.name.clone(), 0));
                bucket.1 += 1;
            }
        }
    }

    groups
        .into_iter()
        .take(facet_limit)
        .map(|(slug, (pk, name, values))| StringFacetBucket {
            pk,
            slug,
            name,
            values: values
                .into_iter()
                .take(value_limit)
                .map(|(value_pk, (value_name, count))| ValueBucket {
                    pk: value_pk,
                    name: value_name,
                    count,
                })
                .collect(),
        })
        .collect()
}

/// Min/max per numeric facet over a document set.
fn aggregate_number_stats(docs: &[(i64, ProductDocument)]) -> BTreeMap<String, (NumberFacetBucket, Decimal, Decimal)> {
    let mut stats: BTreeMap<String, (NumberFacetBucket, Decimal, Decimal)> = BTreeMap::new();
    for (_, doc) in docs {
        for entry in &doc.number_facets {
            let bucket = stats.entry(entry.slug.clone()).or_insert_with(|| {
                (
                    NumberFacetBucket {
                        pk: entry.pk,
                        slug: entry.slug.clone(),
                        name: entry.name.clone(),
                        suffix: entry.suffix.clone(),
                        stats: Stats::default(),
                        total_stats: Stats::default(),
                    },
                    entry.value,
                    entry.value,
                )
            });
            bucket.1 = bucket.1.min(entry.value);
            bucket.2 = bucket.2.max(entry.value);
        }
    }
    stats
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn get(&self, id: &str) -> Result<Option<ProductDocument>> {
        let Ok(pk) = id.parse::<i64>() else {
            return Ok(None);
        };
        Ok(self.docs.read().get(&pk).cloned())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let mut hits = match &request.kind {
            QueryKind::Filtered(clauses) => self.matching(clauses),
            QueryKind::FullText(fulltext) => self
                .docs
                .read()
                .iter()
                .filter(|(_, doc)| fulltext_matches(&fulltext.query, doc))
                .map(|(pk, doc)| (*pk, doc.clone()))
                .collect(),
        };
        sort_hits(&mut hits, &request.sort);

        let total = hits.len() as u64;
        let hits = hits
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(pk, document)| SearchHit {
                id: pk.to_string(),
                document,
            })
            .collect();
        Ok(SearchPage { total, hits })
    }

    async fn search_family(&self, family_pk: i64) -> Result<Vec<SearchHit>> {
        Ok(self
            .docs
            .read()
            .iter()
            .filter(|(_, doc)| doc.family_pk == family_pk)
            .map(|(pk, doc)| SearchHit {
                id: pk.to_string(),
                document: doc.clone(),
            })
            .collect())
    }

    async fn facet_aggregations(
        &self,
        clauses: &[FilterClause],
        caps: AggregationCaps,
    ) -> Result<FacetAggregations> {
        let filtered_docs = self.matching(clauses);
        let all_docs = self.matching(&[]);

        let string_facets =
            aggregate_string_facets(&filtered_docs, caps.facet_limit, caps.value_limit);

        let filtered_stats = aggregate_number_stats(&filtered_docs);
        let number_facets = aggregate_number_stats(&all_docs)
            .into_iter()
            .take(caps.facet_limit)
            .map(|(slug, (mut bucket, min, max))| {
                bucket.total_stats = Stats {
                    min: Some(min),
                    max: Some(max),
                };
                bucket.stats = filtered_stats
                    .get(&slug)
                    .map(|(_, min, max)| Stats {
                        min: Some(*min),
                        max: Some(*max),
                    })
                    .unwrap_or_default();
                bucket
            })
            .collect();

        Ok(FacetAggregations {
            string_facets,
            number_facets,
        })
    }

    async fn sibling_aggregation(
        &self,
        clauses: &[FilterClause],
        slug: &str,
        size: usize,
    ) -> Result<Vec<ValueBucket>> {
        let docs = self.matching(clauses);
        let mut values: BTreeMap<i64, (String, u64)> = BTreeMap::new();
        for (_, doc) in &docs {
            for group in doc.string_facets.iter().filter(|group| group.slug == slug) {
                for value in &group.values {
                    let bucket = values
                        .entry(value.pk)
                        .or_insert_with(|| (value.name.clone(), 0));
                    bucket.1 += 1;
                }
            }
        }
        Ok(values
            .into_iter()
            .take(size)
            .map(|(pk, (name, count))| ValueBucket { pk, name, count })
            .collect())
    }

    async fn category_aggregations(&self, facet_preview: usize) -> Result<Vec<CategoryBucket>> {
        let docs = self.matching(&[]);
        let mut categories: BTreeMap<String, (i64, String, Vec<(i64, ProductDocument)>)> =
            BTreeMap::new();
        for (pk, doc) in docs {
            let entry = categories
                .entry(doc.category.slug.clone())
                .or_insert_with(|| (doc.category.pk, doc.category.name.clone(), Vec::new()));
            entry.2.push((pk, doc));
        }

        Ok(categories
            .into_iter()
            .map(|(slug, (pk, name, docs))| CategoryBucket {
                pk,
                name,
                slug,
                count: docs.len() as u64,
                sfacets: aggregate_string_facets(&docs, facet_preview, facet_preview),
            })
            .collect())
    }

    async fn suggest(&self, prefix: &str, size: usize) -> Result<Vec<String>> {
        let prefix = prefix.to_lowercase();
        let mut completions: Vec<String> = Vec::new();
        for doc in self.docs.read().values() {
            if doc.completion.to_lowercase().starts_with(&prefix)
                && !completions.contains(&doc.completion)
            {
                completions.push(doc.completion.clone());
            }
        }
        completions.sort();
        completions.truncate(size);
        Ok(completions)
    }

    async fn index_document(&self, document: &ProductDocument) -> Result<()> {
        self.docs
            .write()
            .insert(document.variant.pk, document.clone());
        Ok(())
    }

    async fn bulk_index(&self, documents: &[ProductDocument], chunk_size: usize) -> Result<()> {
        for chunk in documents.chunks(chunk_size.max(1)) {
            let mut docs = self.docs.write();
            for document in chunk {
                docs.insert(document.variant.pk, document.clone());
            }
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let Ok(pk) = id.parse::<i64>() else {
            return Ok(false);
        };
        Ok(self.docs.write().remove(&pk).is_some())
    }

    async fn update_by_query(&self, script: &UpdateScript) -> Result<UpdateOutcome> {
        let mut docs = self.docs.write();
        let mut outcome = UpdateOutcome::default();
        for doc in docs.values_mut() {
            if selector_matches(&script.selector, doc) {
                apply_op(doc, &script.op);
                outcome.updated += 1;
            }
        }
        Ok(outcome)
    }

    async fn delete_by_query(&self, selector: &DocSelector) -> Result<u64> {
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|_, doc| !selector_matches(selector, doc));
        Ok((before - docs.len()) as u64)
    }
}
