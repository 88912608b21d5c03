//! The catalog search facade.
//!
//! [`CatalogSearch`] ties the layers together: validated parameters go
//! through the filter builder, the request runs on the injected
//! [`SearchBackend`], and raw pages and buckets come back shaped by the
//! formatter. Write-side operations project catalog records into documents
//! or dispatch typed partial-update scripts; none of them reads back what it
//! wrote.

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::document::{
    EntityRef, FacetDef, FacetValueRef, ProductFamily, TagRef, Variant, project_family,
    project_variant,
};
use crate::error::{Error, Result};
use crate::executor::scripts::{DocSelector, UpdateScript};
use crate::executor::{
    AggregationCaps, QueryKind, SearchBackend, SearchHit, SearchRequest, UpdateOutcome,
    ValueBucket,
};
use crate::format::{
    CategorySummary, Facets, ProductDetail, ProductItem, ProductList, format_facets,
    format_product_detail, format_product_item, format_product_list, overlay_sibling_values,
};
use crate::params::SearchParams;
use crate::query::{FullTextQuery, build_filter};

/// Catalog search and index-maintenance operations over one backend.
pub struct CatalogSearch<B: SearchBackend> {
    backend: B,
    config: SearchConfig,
}

impl<B: SearchBackend> CatalogSearch<B> {
    /// Wrap a backend with the default tuning.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, SearchConfig::default())
    }

    /// Wrap a backend with explicit tuning.
    pub fn with_config(backend: B, config: SearchConfig) -> Self {
        CatalogSearch { backend, config }
    }

    /// The backend this facade runs on.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn caps(&self) -> AggregationCaps {
        AggregationCaps {
            facet_limit: self.config.agg_facet_limit,
            value_limit: self.config.agg_value_limit,
        }
    }

    /// Filtered, sorted, paginated product listing.
    ///
    /// An empty parameter set lists the whole catalog, first page, sorted by
    /// name.
    pub async fn products(&self, params: &SearchParams) -> Result<ProductList> {
        params.validate()?;
        let clauses = build_filter(params, None);
        debug!(clauses = clauses.len(), page = params.page_number(), "product listing");
        let request = SearchRequest {
            kind: QueryKind::Filtered(clauses),
            sort: params.sort_spec(),
            from: self.config.page_offset(params.page_number()),
            size: self.config.page_size,
        };
        let page = self.backend.search(&request).await?;
        Ok(format_product_list(&page))
    }

    /// Free-text relevance search. Requires a non-blank `q`.
    pub async fn search(&self, params: &SearchParams) -> Result<ProductList> {
        params.validate()?;
        let query = params
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::validation("q", "query must not be blank"))?;
        let request = SearchRequest {
            kind: QueryKind::FullText(FullTextQuery::new(query)),
            sort: params.sort_spec(),
            from: self.config.page_offset(params.page_number()),
            size: self.config.page_size,
        };
        let page = self.backend.search(&request).await?;
        Ok(format_product_list(&page))
    }

    /// One product family with all of its indexed variants grouped.
    ///
    /// A family with no indexed variants is [`Error::NotFound`].
    pub async fn product(&self, family_pk: i64) -> Result<ProductDetail> {
        let hits = self.backend.search_family(family_pk).await?;
        format_product_detail(&hits)
    }

    /// One indexed variant by pk.
    pub async fn variant(&self, variant_pk: i64) -> Result<ProductItem> {
        let id = variant_pk.to_string();
        let document = self
            .backend
            .get(&id)
            .await?
            .ok_or_else(|| Error::not_found(format!("no indexed variant {variant_pk}")))?;
        Ok(format_product_item(&SearchHit { id, document }))
    }

    /// Facet summary for the filtered document set.
    ///
    /// For every string attribute the caller is actively filtering on, the
    /// value buckets are recomputed with that attribute's own selection
    /// excluded, so its alternatives stay visible. Recomputations run
    /// concurrently, one per selected attribute.
    pub async fn facets(&self, params: &SearchParams) -> Result<Facets> {
        params.validate()?;
        let clauses = build_filter(params, None);
        let mut aggregations = self.backend.facet_aggregations(&clauses, self.caps()).await?;

        let siblings = try_join_all(params.sfacets.iter().map(|selection| {
            let clauses = build_filter(params, Some(&selection.slug));
            async move {
                let values = self
                    .backend
                    .sibling_aggregation(&clauses, &selection.slug, self.config.agg_value_limit)
                    .await?;
                Ok::<_, Error>((selection.slug.as_str(), values))
            }
        }))
        .await?;
        for (slug, values) in siblings {
            overlay_sibling_values(&mut aggregations, slug, values);
        }

        Ok(format_facets(aggregations))
    }

    /// Full value enumeration of one string attribute ("show all" UIs).
    ///
    /// The attribute's own selection is excluded from the filter, same as
    /// the sibling recomputation in [`facets`](Self::facets).
    pub async fn facet_values(&self, slug: &str, params: &SearchParams) -> Result<Vec<ValueBucket>> {
        params.validate()?;
        if slug.trim().is_empty() {
            return Err(Error::validation("slug", "facet slug must not be blank"));
        }
        let clauses = build_filter(params, Some(slug));
        self.backend
            .sibling_aggregation(&clauses, slug, self.config.full_enum_size)
            .await
    }

    /// Every category present in the index, with a short facet preview.
    pub async fn categories(&self) -> Result<Vec<CategorySummary>> {
        self.backend
            .category_aggregations(self.config.category_facet_preview)
            .await
    }

    /// Deduplicated name completions for a prefix. Blank prefixes complete
    /// to nothing.
    pub async fn autocomplete(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        self.backend.suggest(prefix, self.config.suggest_size).await
    }

    /// Project a family and index one document per active variant.
    ///
    /// Returns the number of documents written. Sale prices are resolved
    /// now and stored denormalized.
    pub async fn index_family(&self, family: &ProductFamily) -> Result<usize> {
        let documents = project_family(family, Utc::now());
        self.backend
            .bulk_index(&documents, self.config.bulk_chunk_size)
            .await?;
        info!(family_pk = family.pk, documents = documents.len(), "family indexed");
        Ok(documents.len())
    }

    /// Bring one variant's document in line with the catalog record.
    ///
    /// An active variant gets its document rewritten; a variant that left
    /// the active status (or the family) gets its document deleted.
    pub async fn reindex_variant(&self, family: &ProductFamily, variant_pk: i64) -> Result<()> {
        let documents = project_family(family, Utc::now());
        match documents.iter().find(|doc| doc.variant.pk == variant_pk) {
            Some(document) => self.backend.index_document(document).await,
            None => {
                self.backend.delete_document(&variant_pk.to_string()).await?;
                Ok(())
            }
        }
    }

    /// Remove one variant's document. Returns whether it was indexed.
    pub async fn deactivate_variant(&self, variant_pk: i64) -> Result<bool> {
        self.backend.delete_document(&variant_pk.to_string()).await
    }

    /// Rewrite the embedded category on every document in it.
    pub async fn rename_category(&self, category: EntityRef) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::update_category(category))
            .await
    }

    /// Drop every document of a deleted category. Returns the count.
    pub async fn delete_category(&self, category_pk: i64) -> Result<u64> {
        self.backend
            .delete_by_query(&DocSelector::Category(category_pk))
            .await
    }

    /// Rewrite the embedded manufacturer on every document of it.
    pub async fn rename_manufacturer(&self, manufacturer: EntityRef) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::update_manufacturer(manufacturer))
            .await
    }

    /// Drop every document of a deleted manufacturer. Returns the count.
    pub async fn delete_manufacturer(&self, manufacturer_pk: i64) -> Result<u64> {
        self.backend
            .delete_by_query(&DocSelector::Manufacturer(manufacturer_pk))
            .await
    }

    /// Rename a tag on every document carrying it.
    pub async fn rename_tag(&self, tag: TagRef) -> Result<UpdateOutcome> {
        self.backend.update_by_query(&UpdateScript::update_tag(tag)).await
    }

    /// Remove a deleted tag from every document carrying it.
    pub async fn remove_tag(&self, tag_pk: i64) -> Result<UpdateOutcome> {
        self.backend.update_by_query(&UpdateScript::remove_tag(tag_pk)).await
    }

    /// Rename a string attribute (name and slug) everywhere it occurs.
    pub async fn rename_string_facet(&self, facet: FacetDef) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::update_string_facet(facet))
            .await
    }

    /// Drop a deleted string attribute everywhere it occurs.
    pub async fn remove_string_facet(&self, facet_pk: i64) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::remove_string_facet(facet_pk))
            .await
    }

    /// Rename one value of a string attribute everywhere it occurs.
    pub async fn rename_string_facet_value(
        &self,
        facet_pk: i64,
        value: FacetValueRef,
    ) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::update_string_facet_value(facet_pk, value))
            .await
    }

    /// Drop one deleted value of a string attribute everywhere it occurs.
    pub async fn remove_string_facet_value(
        &self,
        facet_pk: i64,
        value_pk: i64,
    ) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::remove_string_facet_value(facet_pk, value_pk))
            .await
    }

    /// Rename a numeric attribute (name, slug, suffix) everywhere it occurs.
    pub async fn rename_number_facet(
        &self,
        facet: FacetDef,
        suffix: Option<String>,
    ) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::update_number_facet(facet, suffix))
            .await
    }

    /// Drop a deleted numeric attribute everywhere it occurs.
    pub async fn remove_number_facet(&self, facet_pk: i64) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::remove_number_facet(facet_pk))
            .await
    }

    /// Add the given variants to a collection.
    pub async fn add_to_collection(
        &self,
        variant_pks: Vec<i64>,
        collection_pk: i64,
    ) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::add_to_collection(variant_pks, collection_pk))
            .await
    }

    /// Remove a dissolved collection from every member variant.
    pub async fn remove_collection(&self, collection_pk: i64) -> Result<UpdateOutcome> {
        self.backend
            .update_by_query(&UpdateScript::remove_collection(collection_pk))
            .await
    }

    /// Re-resolve sale prices for the given catalog variants and patch each
    /// indexed document in place.
    ///
    /// The variants' `sales` lists are the source of truth: call this after
    /// attaching a sale, and again after a sale ends or is detached. Updates
    /// run concurrently; conflict counts are merged, never escalated.
    pub async fn apply_sale(&self, variants: &[Variant]) -> Result<UpdateOutcome> {
        let now = Utc::now();
        let scripts: Vec<UpdateScript> = variants
            .iter()
            .map(|variant| {
                let doc = project_variant(variant, now);
                UpdateScript::set_variant_sales(variant.pk, doc.sales, doc.price, doc.old_price)
            })
            .collect();
        let outcomes = try_join_all(
            scripts
                .iter()
                .map(|script| self.backend.update_by_query(script)),
        )
        .await?;
        let outcome = outcomes
            .into_iter()
            .fold(UpdateOutcome::default(), UpdateOutcome::merge);
        info!(
            variants = variants.len(),
            updated = outcome.updated,
            conflicts = outcome.conflicts,
            "variant sales synced"
        );
        Ok(outcome)
    }

    /// Detach one sale from the given variants and re-resolve their prices.
    pub async fn remove_sale(&self, sale_pk: i64, variants: &[Variant]) -> Result<UpdateOutcome> {
        let stripped: Vec<Variant> = variants
            .iter()
            .cloned()
            .map(|mut variant| {
                variant.sales.retain(|sale| sale.pk != sale_pk);
                variant
            })
            .collect();
        self.apply_sale(&stripped).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::memory::MemoryBackend;

    #[tokio::test]
    async fn test_search_requires_query() {
        let catalog = CatalogSearch::new(MemoryBackend::new());
        let params = SearchParams {
            q: Some("   ".to_string()),
            ..SearchParams::default()
        };
        let err = catalog.search(&params).await.unwrap_err();
        assert!(matches!(err, Error::Validation { field, .. } if field == "q"));
    }

    #[tokio::test]
    async fn test_blank_autocomplete_completes_to_nothing() {
        let catalog = CatalogSearch::new(MemoryBackend::new());
        assert!(catalog.autocomplete("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_facet_values_rejects_blank_slug() {
        let catalog = CatalogSearch::new(MemoryBackend::new());
        let err = catalog
            .facet_values(" ", &SearchParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field, .. } if field == "slug"));
    }

    #[tokio::test]
    async fn test_missing_variant_is_not_found() {
        let catalog = CatalogSearch::new(MemoryBackend::new());
        let err = catalog.variant(404).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
