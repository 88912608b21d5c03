//! Configuration for query construction and the document index connection.
//!
//! The aggregation size caps were inherited as magic constants from earlier
//! revisions of the catalog; they are explicit configuration here, with the
//! historical values as defaults.

use std::time::Duration;

/// Tuning knobs for search and aggregation queries.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Hits per result page.
    pub page_size: usize,
    /// Maximum number of facet attributes returned by an aggregation.
    pub agg_facet_limit: usize,
    /// Maximum number of values returned per facet attribute.
    pub agg_value_limit: usize,
    /// Number of facet values shown in a category landing-page preview.
    pub category_facet_preview: usize,
    /// Bucket size for the full-enumeration facet query ("show all" UIs).
    pub full_enum_size: usize,
    /// Number of documents per bulk indexing request.
    pub bulk_chunk_size: usize,
    /// Maximum autocomplete suggestions returned.
    pub suggest_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            page_size: 24,
            agg_facet_limit: 100,
            agg_value_limit: 10,
            category_facet_preview: 7,
            full_enum_size: 1000,
            bulk_chunk_size: 500,
            suggest_size: 10,
        }
    }
}

impl SearchConfig {
    /// Create a config with the default caps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-attribute value cap for aggregations.
    pub fn with_agg_value_limit(mut self, limit: usize) -> Self {
        self.agg_value_limit = limit;
        self
    }

    /// First hit offset for a 1-based page number.
    pub fn page_offset(&self, page: u32) -> usize {
        self.page_size * (page.saturating_sub(1) as usize)
    }
}

/// Connection settings for the Elasticsearch-compatible document index.
///
/// Constructed explicitly at process start and injected into the backend;
/// there is no ambient module-level client.
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `http://elastic:9200`.
    pub base_url: String,
    /// Index name holding the product documents.
    pub index: String,
    /// Optional basic-auth credentials.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ElasticConfig {
    /// Create a config for the given cluster URL and index.
    pub fn new<U: Into<String>, I: Into<String>>(base_url: U, index: I) -> Self {
        ElasticConfig {
            base_url: base_url.into(),
            index: index.into(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set basic-auth credentials.
    pub fn with_auth<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps() {
        let config = SearchConfig::default();
        assert_eq!(config.page_size, 24);
        assert_eq!(config.agg_facet_limit, 100);
        assert_eq!(config.agg_value_limit, 10);
        assert_eq!(config.category_facet_preview, 7);
    }

    #[test]
    fn test_page_offset() {
        let config = SearchConfig::default().with_page_size(5);
        assert_eq!(config.page_offset(1), 0);
        assert_eq!(config.page_offset(2), 5);
        assert_eq!(config.page_offset(4), 15);
    }
}
