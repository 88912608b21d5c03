//! Filter query construction.
//!
//! [`build_filter`] turns validated [`SearchParams`] into a flat list of
//! [`FilterClause`]s, combined with implicit AND by every backend. Clauses
//! are typed variants rather than raw DSL fragments so the builder can be
//! checked exhaustively; rendering into the document index's own query
//! language is the backend adapter's job.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::params::SearchParams;

/// One independent filter clause. A document matches a clause list iff it
/// matches every clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterClause {
    /// Exact match on the category slug.
    Category(String),
    /// The document's tag list contains this tag.
    ///
    /// One clause is emitted *per selected tag*, so multiple tags combine as
    /// AND, a deliberate deviation from the OR-within-field semantics used
    /// by every other multi-valued filter. Preserve it; do not "fix" it.
    Tag(i64),
    /// The variant carries any of these sales (OR within).
    Sales(Vec<i64>),
    /// The variant belongs to any of these collections (OR within).
    Collections(Vec<i64>),
    /// The document carries this string facet with at least one of the
    /// selected values (OR within values, AND across attributes).
    StringFacet { slug: String, value_ids: Vec<i64> },
    /// The document carries this numeric facet with a value in the inclusive
    /// range.
    NumericFacet {
        slug: String,
        min: Decimal,
        max: Decimal,
    },
}

impl FilterClause {
    /// The string-facet attribute slug this clause constrains, if any.
    pub fn string_facet_slug(&self) -> Option<&str> {
        match self {
            FilterClause::StringFacet { slug, .. } => Some(slug),
            _ => None,
        }
    }
}

/// Build the filter clause list for a parameter set.
///
/// Pure and deterministic: identical input yields an identical clause list,
/// emitted in the order category, tags, sales, collections, string facets,
/// numeric facets.
///
/// `exclude_facet` skips the clause for the named string-facet attribute
/// entirely, leaving every other constraint in place. Sibling-facet
/// recomputation uses this so a facet's own filter never hides its other
/// selectable values.
pub fn build_filter(params: &SearchParams, exclude_facet: Option<&str>) -> Vec<FilterClause> {
    let mut clauses = Vec::new();

    if let Some(category) = &params.category {
        clauses.push(FilterClause::Category(category.clone()));
    }

    for tag in &params.tags {
        clauses.push(FilterClause::Tag(*tag));
    }

    if !params.sales.is_empty() {
        clauses.push(FilterClause::Sales(params.sales.clone()));
    }

    if !params.collections.is_empty() {
        clauses.push(FilterClause::Collections(params.collections.clone()));
    }

    for selection in &params.sfacets {
        if exclude_facet == Some(selection.slug.as_str()) {
            continue;
        }
        clauses.push(FilterClause::StringFacet {
            slug: selection.slug.clone(),
            value_ids: selection.value_ids.clone(),
        });
    }

    for selection in &params.nfacets {
        clauses.push(FilterClause::NumericFacet {
            slug: selection.slug.clone(),
            min: selection.min,
            max: selection.max,
        });
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{NumericFacetSelection, StringFacetSelection};
    use rust_decimal_macros::dec;

    fn params() -> SearchParams {
        SearchParams {
            category: Some("beer".to_string()),
            tags: vec![3, 7],
            sales: vec![1],
            collections: vec![2, 4],
            sfacets: vec![
                StringFacetSelection {
                    slug: "country".to_string(),
                    value_ids: vec![15, 16],
                },
                StringFacetSelection {
                    slug: "taste".to_string(),
                    value_ids: vec![9],
                },
            ],
            nfacets: vec![NumericFacetSelection {
                slug: "density".to_string(),
                min: dec!(20),
                max: dec!(21),
            }],
            ..SearchParams::default()
        }
    }

    #[test]
    fn test_emission_order_and_determinism() {
        let clauses = build_filter(&params(), None);
        assert_eq!(clauses.len(), 8);
        assert_eq!(clauses[0], FilterClause::Category("beer".to_string()));
        assert_eq!(clauses[1], FilterClause::Tag(3));
        assert_eq!(clauses[2], FilterClause::Tag(7));
        assert_eq!(clauses[3], FilterClause::Sales(vec![1]));
        assert_eq!(clauses[4], FilterClause::Collections(vec![2, 4]));
        assert!(matches!(&clauses[5], FilterClause::StringFacet { slug, .. } if slug == "country"));
        assert!(matches!(&clauses[6], FilterClause::StringFacet { slug, .. } if slug == "taste"));
        assert!(matches!(&clauses[7], FilterClause::NumericFacet { slug, .. } if slug == "density"));

        // Determinism: identical input, identical clause list.
        assert_eq!(build_filter(&params(), None), build_filter(&params(), None));
    }

    #[test]
    fn test_tags_are_and_combined() {
        // Each tag id gets its own clause; the implicit AND across the list
        // means a document must carry all of them.
        let clauses = build_filter(&params(), None);
        let tag_clauses: Vec<_> = clauses
            .iter()
            .filter(|c| matches!(c, FilterClause::Tag(_)))
            .collect();
        assert_eq!(tag_clauses.len(), 2);
    }

    #[test]
    fn test_exclude_facet_removes_only_that_attribute() {
        let full = build_filter(&params(), None);
        let excluded = build_filter(&params(), Some("country"));

        assert!(
            excluded
                .iter()
                .all(|c| c.string_facet_slug() != Some("country")),
            "no clause may reference the excluded attribute"
        );
        // Otherwise identical to the unexcluded list.
        let without_country: Vec<_> = full
            .iter()
            .filter(|c| c.string_facet_slug() != Some("country"))
            .cloned()
            .collect();
        assert_eq!(excluded, without_country);
    }

    #[test]
    fn test_exclude_unknown_facet_is_a_no_op() {
        assert_eq!(build_filter(&params(), Some("nope")), build_filter(&params(), None));
    }

    #[test]
    fn test_empty_params_build_no_clauses() {
        assert!(build_filter(&SearchParams::default(), None).is_empty());
    }
}
