//! Free-text query description.
//!
//! Full-text relevance scoring lives in the document index; this type only
//! names the fields and operators the search should-query runs over. The
//! field set mirrors the index schema's full-text variants: exact fields
//! with boosts, the phonetic field, the locale-aware stemmed field, and its
//! edge-ngram subfield for prefix matching.

use serde::{Deserialize, Serialize};

/// A free-text catalog search over the index's full-text fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextQuery {
    pub query: String,
}

impl FullTextQuery {
    /// Create a free-text query.
    pub fn new<S: Into<String>>(query: S) -> Self {
        FullTextQuery {
            query: query.into(),
        }
    }

    /// Cross-field exact-match targets with boosts, `field^boost`.
    pub fn cross_fields() -> &'static [&'static str] {
        &["name^2", "manufacturer.name^2", "category.name"]
    }

    /// Single-field match targets tried alongside the cross-field query.
    pub fn match_fields() -> &'static [&'static str] {
        &["fulltext_phonetic", "fulltext_locale", "fulltext_locale.edge"]
    }
}
