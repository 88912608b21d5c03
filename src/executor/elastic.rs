//! Elasticsearch adapter.
//!
//! Renders typed requests into the bool/filter query DSL and the two-level
//! nested aggregation bodies the product index uses, sends them over HTTP,
//! and parses the raw responses back into typed results. The client object
//! is constructed explicitly from [`ElasticConfig`] and injected; nothing in
//! this module holds global connection state.

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::config::ElasticConfig;
use crate::document::ProductDocument;
use crate::error::{Error, Result};
use crate::executor::scripts::{DocSelector, UpdateScript};
use crate::executor::{
    AggregationCaps, CategoryBucket, FacetAggregations, NumberFacetBucket, QueryKind,
    SearchBackend, SearchHit, SearchPage, SearchRequest, Stats, StringFacetBucket, UpdateOutcome,
    ValueBucket,
};
use crate::params::SortSpec;
use crate::query::{FilterClause, FullTextQuery};

/// Full-text source fields excluded from search hits.
const SOURCE_EXCLUDES: [&str; 3] = ["completion", "fulltext_locale", "fulltext_phonetic"];

/// Upper bound on documents fetched for one family.
const FAMILY_FETCH_SIZE: usize = 1000;

/// HTTP adapter to an Elasticsearch-compatible cluster.
pub struct ElasticBackend {
    client: reqwest::Client,
    config: ElasticConfig,
}

impl ElasticBackend {
    /// Build a backend for the given cluster and index.
    pub fn new(config: ElasticConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::from)?;
        Ok(ElasticBackend { client, config })
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.index,
            suffix
        )
    }

    /// Send one request; `allow_not_found` lets point lookups see the 404
    /// instead of an error.
    async fn send(
        &self,
        method: Method,
        suffix: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        allow_not_found: bool,
    ) -> Result<Option<Value>> {
        let mut request = self.client.request(method, self.url(suffix)).query(query);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND && allow_not_found {
            return Ok(None);
        }
        let payload: Value = response.json().await?;
        if status.is_success() {
            return Ok(Some(payload));
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::transport(format!(
                "search engine returned {status}: {payload}"
            )));
        }
        Err(Error::backend(format!(
            "search engine rejected request with {status}: {payload}"
        )))
    }

    async fn send_search(&self, body: &Value) -> Result<Value> {
        debug!(body = %body, "elastic search");
        self.send(Method::POST, "_search", &[], Some(body), false)
            .await?
            .ok_or_else(|| Error::backend("empty search response"))
    }
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    async fn get(&self, id: &str) -> Result<Option<ProductDocument>> {
        let Some(payload) = self
            .send(Method::GET, &format!("_doc/{id}"), &[], None, true)
            .await?
        else {
            return Ok(None);
        };
        let source = pluck(&payload, &["_source"])?;
        Ok(Some(serde_json::from_value(source.clone())?))
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let payload = self.send_search(&search_body(request)).await?;
        parse_search_page(&payload)
    }

    async fn search_family(&self, family_pk: i64) -> Result<Vec<SearchHit>> {
        let body = json!({
            "_source": { "excludes": SOURCE_EXCLUDES },
            "query": { "bool": { "filter": [ { "term": { "family_pk": family_pk } } ] } },
            "sort": [ { "variant.pk": "asc" } ],
            "size": FAMILY_FETCH_SIZE,
        });
        let payload = self.send_search(&body).await?;
        Ok(parse_search_page(&payload)?.hits)
    }

    async fn facet_aggregations(
        &self,
        clauses: &[FilterClause],
        caps: AggregationCaps,
    ) -> Result<FacetAggregations> {
        let payload = self.send_search(&facet_aggs_body(clauses, caps)).await?;
        parse_facet_aggregations(&payload)
    }

    async fn sibling_aggregation(
        &self,
        clauses: &[FilterClause],
        slug: &str,
        size: usize,
    ) -> Result<Vec<ValueBucket>> {
        let payload = self
            .send_search(&sibling_aggs_body(clauses, slug, size))
            .await?;
        parse_sibling_buckets(&payload)
    }

    async fn category_aggregations(&self, facet_preview: usize) -> Result<Vec<CategoryBucket>> {
        let payload = self.send_search(&categories_body(facet_preview)).await?;
        parse_category_buckets(&payload)
    }

    async fn suggest(&self, prefix: &str, size: usize) -> Result<Vec<String>> {
        let body = json!({
            "suggest": {
                "search-suggest": {
                    "prefix": prefix,
                    "completion": {
                        "field": "completion",
                        "fuzzy": true,
                        "skip_duplicates": true,
                        "size": size,
                    }
                }
            }
        });
        let payload = self.send_search(&body).await?;
        let options = pluck(&payload, &["suggest", "search-suggest"])?
            .get(0)
            .and_then(|entry| entry.get("options"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut completions = Vec::new();
        for option in &options {
            let text = pluck_str(option, &["text"])?;
            if !completions.iter().any(|c| c == text) {
                completions.push(text.to_string());
            }
        }
        Ok(completions)
    }

    async fn index_document(&self, document: &ProductDocument) -> Result<()> {
        let body = serde_json::to_value(document)?;
        self.send(
            Method::PUT,
            &format!("_doc/{}", document.doc_id()),
            &[],
            Some(&body),
            false,
        )
        .await?;
        Ok(())
    }

    async fn bulk_index(&self, documents: &[ProductDocument], chunk_size: usize) -> Result<()> {
        for chunk in documents.chunks(chunk_size.max(1)) {
            let mut ndjson = String::new();
            for document in chunk {
                let action = json!({ "index": { "_index": self.config.index, "_id": document.doc_id() } });
                ndjson.push_str(&action.to_string());
                ndjson.push('\n');
                ndjson.push_str(&serde_json::to_string(document)?);
                ndjson.push('\n');
            }

            let mut request = self
                .client
                .post(format!(
                    "{}/_bulk",
                    self.config.base_url.trim_end_matches('/')
                ))
                .header("content-type", "application/x-ndjson")
                .body(ndjson);
            if let Some(username) = &self.config.username {
                request = request.basic_auth(username, self.config.password.as_deref());
            }
            let response = request.send().await?;
            let status = response.status();
            let payload: Value = response.json().await?;
            if !status.is_success() {
                return Err(Error::transport(format!("bulk indexing failed: {status}")));
            }
            if payload.get("errors").and_then(Value::as_bool) == Some(true) {
                return Err(Error::backend(format!(
                    "bulk indexing reported item errors: {payload}"
                )));
            }
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let deleted = self
            .send(Method::DELETE, &format!("_doc/{id}"), &[], None, true)
            .await?;
        Ok(deleted.is_some())
    }

    async fn update_by_query(&self, script: &UpdateScript) -> Result<UpdateOutcome> {
        let rendered = script.painless();
        let body = json!({
            "query": selector_query(&script.selector),
            "script": {
                "lang": "painless",
                "source": rendered.source,
                "params": rendered.params,
            }
        });
        let payload = self
            .send(
                Method::POST,
                "_update_by_query",
                &[("conflicts", "proceed")],
                Some(&body),
                false,
            )
            .await?
            .ok_or_else(|| Error::backend("empty update-by-query response"))?;

        let outcome = UpdateOutcome {
            updated: pluck_u64(&payload, &["updated"])?,
            conflicts: payload
                .get("version_conflicts")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        };
        if outcome.conflicts > 0 {
            warn!(
                conflicts = outcome.conflicts,
                updated = outcome.updated,
                "update-by-query skipped concurrently modified documents"
            );
        }
        Ok(outcome)
    }

    async fn delete_by_query(&self, selector: &DocSelector) -> Result<u64> {
        let body = json!({ "query": selector_query(selector) });
        let payload = self
            .send(
                Method::POST,
                "_delete_by_query",
                &[("conflicts", "proceed")],
                Some(&body),
                false,
            )
            .await?
            .ok_or_else(|| Error::backend("empty delete-by-query response"))?;
        pluck_u64(&payload, &["deleted"])
    }
}

// --- query DSL rendering ---

/// Render one filter clause into the index's query DSL.
pub(crate) fn clause_json(clause: &FilterClause) -> Value {
    match clause {
        FilterClause::Category(slug) => json!({ "term": { "category.slug": slug } }),
        FilterClause::Tag(pk) => json!({
            "nested": {
                "path": "tags",
                "query": { "bool": { "filter": { "term": { "tags.pk": pk } } } }
            }
        }),
        FilterClause::Sales(pks) => json!({ "terms": { "variant.sales.pk": pks } }),
        FilterClause::Collections(pks) => json!({ "terms": { "variant.collections": pks } }),
        FilterClause::StringFacet { slug, value_ids } => json!({
            "nested": {
                "path": "string_facets",
                "query": {
                    "bool": {
                        "filter": [
                            { "term": { "string_facets.slug": slug } },
                            {
                                "nested": {
                                    "path": "string_facets.values",
                                    "query": { "terms": { "string_facets.values.pk": value_ids } }
                                }
                            }
                        ]
                    }
                }
            }
        }),
        FilterClause::NumericFacet { slug, min, max } => json!({
            "nested": {
                "path": "number_facets",
                "query": {
                    "bool": {
                        "filter": [
                            { "term": { "number_facets.slug": slug } },
                            { "range": { "number_facets.value": { "gte": min, "lte": max } } }
                        ]
                    }
                }
            }
        }),
    }
}

fn filter_json(clauses: &[FilterClause]) -> Vec<Value> {
    clauses.iter().map(clause_json).collect()
}

fn fulltext_json(query: &FullTextQuery) -> Value {
    json!({
        "should": [
            {
                "multi_match": {
                    "fields": FullTextQuery::cross_fields(),
                    "operator": "AND",
                    "type": "cross_fields",
                    "query": query.query,
                }
            },
            { "match": { "fulltext_phonetic": { "operator": "AND", "query": query.query } } },
            { "match": { "fulltext_locale": { "operator": "AND", "query": query.query } } },
            { "match": { "fulltext_locale.edge": { "operator": "AND", "query": query.query } } },
        ]
    })
}

fn sort_json(sort: &SortSpec) -> Value {
    json!([ { (sort.field.as_str()): sort.order.as_str() } ])
}

/// Full search body: query, sort, paging, source excludes.
pub(crate) fn search_body(request: &SearchRequest) -> Value {
    let query = match &request.kind {
        QueryKind::Filtered(clauses) => json!({ "bool": { "filter": filter_json(clauses) } }),
        QueryKind::FullText(fulltext) => json!({ "bool": fulltext_json(fulltext) }),
    };
    json!({
        "_source": { "excludes": SOURCE_EXCLUDES },
        "query": query,
        "sort": sort_json(&request.sort),
        "from": request.from,
        "size": request.size,
    })
}

/// Aggregation body for the facet summary.
///
/// String facets and *filtered* numeric stats run under a `filter` agg so
/// they reflect the current selection; a second numeric stats agg runs
/// unfiltered for the global range bounds.
pub(crate) fn facet_aggs_body(clauses: &[FilterClause], caps: AggregationCaps) -> Value {
    let number_facets_agg = |name: &str| {
        json!({
            "nested": { "path": "number_facets" },
            "aggs": {
                "facets_code": {
                    "terms": {
                        "field": "number_facets.slug",
                        "size": caps.facet_limit,
                        "order": { "_key": "asc" }
                    },
                    "aggs": {
                        "facets_src": {
                            "top_hits": { "size": 1, "_source": { "includes": ["number_facets"] } }
                        },
                        (name): { "stats": { "field": "number_facets.value" } }
                    }
                }
            }
        })
    };

    json!({
        "size": 0,
        "aggs": {
            "string_facets_filter": {
                "filter": { "bool": { "filter": filter_json(clauses) } },
                "aggs": {
                    "string_facets": {
                        "nested": { "path": "string_facets" },
                        "aggs": {
                            "facets_code": {
                                "terms": {
                                    "field": "string_facets.slug",
                                    "size": caps.facet_limit,
                                    "order": { "_key": "asc" }
                                },
                                "aggs": {
                                    "facets_src": {
                                        "top_hits": {
                                            "size": 1,
                                            "_source": { "includes": ["string_facets.pk", "string_facets.slug", "string_facets.name"] }
                                        }
                                    },
                                    "facets_nested": {
                                        "nested": { "path": "string_facets.values" },
                                        "aggs": {
                                            "facet_values": {
                                                "terms": {
                                                    "field": "string_facets.values.pk",
                                                    "size": caps.value_limit,
                                                    "order": { "_key": "asc" }
                                                },
                                                "aggs": {
                                                    "facet_values_src": {
                                                        "top_hits": {
                                                            "size": 1,
                                                            "_source": { "includes": ["string_facets.values.pk", "string_facets.values.name"] }
                                                        }
                                                    }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "number_facets_filtered": number_facets_agg("facets_stats"),
                }
            },
            "number_facets": number_facets_agg("facets_stats"),
        }
    })
}

/// The sibling ("special") aggregation: every active filter applies except
/// the named attribute's own, then that attribute's values are re-counted.
pub(crate) fn sibling_aggs_body(clauses: &[FilterClause], slug: &str, size: usize) -> Value {
    json!({
        "size": 0,
        "aggs": {
            "special_agg": {
                "filter": { "bool": { "filter": filter_json(clauses) } },
                "aggs": {
                    "nested_agg": {
                        "nested": { "path": "string_facets" },
                        "aggs": {
                            "string_facets_agg": {
                                "filter": { "term": { "string_facets.slug": slug } },
                                "aggs": {
                                    "nested_values": {
                                        "nested": { "path": "string_facets.values" },
                                        "aggs": {
                                            "facets_values": {
                                                "terms": {
                                                    "field": "string_facets.values.pk",
                                                    "size": size,
                                                    "order": { "_key": "asc" }
                                                },
                                                "aggs": {
                                                    "values_src": {
                                                        "top_hits": {
                                                            "size": 1,
                                                            "_source": { "includes": ["string_facets.values.pk", "string_facets.values.name"] }
                                                        }
                                                    }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// One bucket per category with a capped string-facet preview.
pub(crate) fn categories_body(facet_preview: usize) -> Value {
    json!({
        "size": 0,
        "aggs": {
            "categories": {
                "terms": { "field": "category.slug", "order": { "_key": "asc" } },
                "aggs": {
                    "category_src": {
                        "top_hits": { "size": 1, "_source": { "includes": ["category"] } }
                    },
                    "string_facets": {
                        "nested": { "path": "string_facets" },
                        "aggs": {
                            "facets_code": {
                                "terms": {
                                    "field": "string_facets.slug",
                                    "size": facet_preview,
                                    "order": { "_key": "asc" }
                                },
                                "aggs": {
                                    "facets_src": {
                                        "top_hits": {
                                            "size": 1,
                                            "_source": { "includes": ["string_facets.pk", "string_facets.slug", "string_facets.name"] }
                                        }
                                    },
                                    "facets_nested": {
                                        "nested": { "path": "string_facets.values" },
                                        "aggs": {
                                            "facet_values": {
                                                "terms": {
                                                    "field": "string_facets.values.pk",
                                                    "size": facet_preview,
                                                    "order": { "_key": "asc" }
                                                },
                                                "aggs": {
                                                    "facet_values_src": {
                                                        "top_hits": {
                                                            "size": 1,
                                                            "_source": { "includes": ["string_facets.values.pk", "string_facets.values.name"] }
                                                        }
                                                    }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Render an update/delete target as a query.
pub(crate) fn selector_query(selector: &DocSelector) -> Value {
    match selector {
        DocSelector::Family(pk) => json!({ "term": { "family_pk": pk } }),
        DocSelector::Variant(pk) => json!({ "term": { "variant.pk": pk } }),
        DocSelector::Variants(pks) => json!({ "terms": { "variant.pk": pks } }),
        DocSelector::Category(pk) => json!({ "term": { "category.pk": pk } }),
        DocSelector::Manufacturer(pk) => json!({ "term": { "manufacturer.pk": pk } }),
        DocSelector::Tag(pk) => json!({
            "nested": {
                "path": "tags",
                "query": { "bool": { "filter": { "term": { "tags.pk": pk } } } }
            }
        }),
        DocSelector::StringFacet(pk) => json!({
            "nested": {
                "path": "string_facets",
                "query": { "bool": { "filter": { "term": { "string_facets.pk": pk } } } }
            }
        }),
        DocSelector::StringFacetValue { facet_pk, value_pk } => json!({
            "nested": {
                "path": "string_facets",
                "query": {
                    "bool": {
                        "filter": [
                            { "term": { "string_facets.pk": facet_pk } },
                            {
                                "nested": {
                                    "path": "string_facets.values",
                                    "query": { "term": { "string_facets.values.pk": value_pk } }
                                }
                            }
                        ]
                    }
                }
            }
        }),
        DocSelector::NumberFacet(pk) => json!({
            "nested": {
                "path": "number_facets",
                "query": { "bool": { "filter": { "term": { "number_facets.pk": pk } } } }
            }
        }),
        DocSelector::Collection(pk) => json!({ "term": { "variant.collections": pk } }),
    }
}

// --- response parsing ---

fn pluck<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut current = value;
    for key in path {
        current = current
            .get(key)
            .ok_or_else(|| Error::backend(format!("response missing `{}`", path.join("."))))?;
    }
    Ok(current)
}

fn pluck_u64(value: &Value, path: &[&str]) -> Result<u64> {
    pluck(value, path)?
        .as_u64()
        .ok_or_else(|| Error::backend(format!("`{}` is not an integer", path.join("."))))
}

fn pluck_str<'a>(value: &'a Value, path: &[&str]) -> Result<&'a str> {
    pluck(value, path)?
        .as_str()
        .ok_or_else(|| Error::backend(format!("`{}` is not a string", path.join("."))))
}

fn pluck_array<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Vec<Value>> {
    pluck(value, path)?
        .as_array()
        .ok_or_else(|| Error::backend(format!("`{}` is not an array", path.join("."))))
}

/// Parse hits and the total match count.
pub(crate) fn parse_search_page(payload: &Value) -> Result<SearchPage> {
    let total = pluck_u64(payload, &["hits", "total", "value"])?;
    let mut hits = Vec::new();
    for hit in pluck_array(payload, &["hits", "hits"])? {
        let id = pluck_str(hit, &["_id"])?.to_string();
        let document = serde_json::from_value(pluck(hit, &["_source"])?.clone())?;
        hits.push(SearchHit { id, document });
    }
    Ok(SearchPage { total, hits })
}

fn parse_value_buckets(buckets: &[Value], src_key: &str) -> Result<Vec<ValueBucket>> {
    let mut values = Vec::new();
    for bucket in buckets {
        let source = pluck(bucket, &[src_key, "hits", "hits"])?
            .get(0)
            .map(|hit| pluck(hit, &["_source"]))
            .transpose()?
            .ok_or_else(|| Error::backend("value bucket without source hit"))?;
        values.push(ValueBucket {
            pk: pluck_u64(source, &["pk"])? as i64,
            name: pluck_str(source, &["name"])?.to_string(),
            count: pluck_u64(bucket, &["doc_count"])?,
        });
    }
    Ok(values)
}

fn parse_string_facet_buckets(payload: &Value, path: &[&str]) -> Result<Vec<StringFacetBucket>> {
    let mut facets = Vec::new();
    for bucket in pluck_array(payload, path)? {
        let source = pluck(bucket, &["facets_src", "hits", "hits"])?
            .get(0)
            .map(|hit| pluck(hit, &["_source"]))
            .transpose()?
            .ok_or_else(|| Error::backend("facet bucket without source hit"))?;
        let values = parse_value_buckets(
            pluck_array(bucket, &["facets_nested", "facet_values", "buckets"])?,
            "facet_values_src",
        )?;
        facets.push(StringFacetBucket {
            pk: pluck_u64(source, &["pk"])? as i64,
            slug: pluck_str(source, &["slug"])?.to_string(),
            name: pluck_str(source, &["name"])?.to_string(),
            values,
        });
    }
    Ok(facets)
}

fn parse_stats(bucket: &Value, key: &str) -> Stats {
    let number = |field: &str| {
        bucket
            .get(key)
            .and_then(|stats| stats.get(field))
            .and_then(Value::as_f64)
            .and_then(|v| rust_decimal::Decimal::try_from(v).ok())
    };
    Stats {
        min: number("min"),
        max: number("max"),
    }
}

fn parse_number_facet_buckets(
    payload: &Value,
    path: &[&str],
) -> Result<Vec<(String, NumberFacetBucket)>> {
    let mut facets = Vec::new();
    for bucket in pluck_array(payload, path)? {
        let slug = pluck_str(bucket, &["key"])?.to_string();
        let hit = pluck(bucket, &["facets_src", "hits", "hits"])?
            .get(0)
            .ok_or_else(|| Error::backend("number facet bucket without source hit"))?;
        let source = pluck(hit, &["_source"])?;
        // The top hit carries the whole number_facets list; find our slug.
        let entry = pluck_array(source, &["number_facets"])?
            .iter()
            .find(|entry| entry.get("slug").and_then(Value::as_str) == Some(slug.as_str()))
            .ok_or_else(|| Error::backend(format!("facet `{slug}` missing from source hit")))?;
        facets.push((
            slug.clone(),
            NumberFacetBucket {
                pk: pluck_u64(entry, &["pk"])? as i64,
                slug,
                name: pluck_str(entry, &["name"])?.to_string(),
                suffix: entry
                    .get("suffix")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                stats: parse_stats(bucket, "facets_stats"),
                total_stats: Stats::default(),
            },
        ));
    }
    Ok(facets)
}

/// Parse the combined facet aggregation response, merging filtered and
/// global numeric stats by slug.
pub(crate) fn parse_facet_aggregations(payload: &Value) -> Result<FacetAggregations> {
    let string_facets = parse_string_facet_buckets(
        payload,
        &[
            "aggregations",
            "string_facets_filter",
            "string_facets",
            "facets_code",
            "buckets",
        ],
    )?;

    let filtered = parse_number_facet_buckets(
        payload,
        &[
            "aggregations",
            "string_facets_filter",
            "number_facets_filtered",
            "facets_code",
            "buckets",
        ],
    )?;
    let global = parse_number_facet_buckets(
        payload,
        &["aggregations", "number_facets", "facets_code", "buckets"],
    )?;

    // Global buckets define the facet list (a facet filtered down to zero
    // documents still appears, with empty filtered stats).
    let number_facets = global
        .into_iter()
        .map(|(slug, mut bucket)| {
            bucket.total_stats = bucket.stats;
            bucket.stats = filtered
                .iter()
                .find(|(filtered_slug, _)| *filtered_slug == slug)
                .map(|(_, filtered_bucket)| filtered_bucket.stats)
                .unwrap_or_default();
            bucket
        })
        .collect();

    Ok(FacetAggregations {
        string_facets,
        number_facets,
    })
}

/// Parse the sibling-aggregation value buckets.
pub(crate) fn parse_sibling_buckets(payload: &Value) -> Result<Vec<ValueBucket>> {
    parse_value_buckets(
        pluck_array(
            payload,
            &[
                "aggregations",
                "special_agg",
                "nested_agg",
                "string_facets_agg",
                "nested_values",
                "facets_values",
                "buckets",
            ],
        )?,
        "values_src",
    )
}

/// Parse the per-category buckets with their facet previews.
pub(crate) fn parse_category_buckets(payload: &Value) -> Result<Vec<CategoryBucket>> {
    let mut categories = Vec::new();
    for bucket in pluck_array(payload, &["aggregations", "categories", "buckets"])? {
        let hit = pluck(bucket, &["category_src", "hits", "hits"])?
            .get(0)
            .ok_or_else(|| Error::backend("category bucket without source hit"))?;
        let category = pluck(hit, &["_source", "category"])?;
        let sfacets = parse_string_facet_buckets(
            bucket,
            &["string_facets", "facets_code", "buckets"],
        )?;
        categories.push(CategoryBucket {
            pk: pluck_u64(category, &["pk"])? as i64,
            name: pluck_str(category, &["name"])?.to_string(),
            slug: pluck_str(category, &["slug"])?.to_string(),
            count: pluck_u64(bucket, &["doc_count"])?,
            sfacets,
        });
    }
    Ok(categories)
}
