//! Validated query-parameter model for catalog search requests.
//!
//! The HTTP layer hands this core already-decoded parameters; this module
//! gives them a typed shape and rejects malformed input before any query is
//! built. String and numeric facet selections are distinct tagged types so
//! the filter builder can be checked exhaustively, instead of a loose
//! key/value map.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A selection on one string facet: OR within `value_ids`, AND across
/// distinct attributes.
///
/// Wire form (query-string encoding): `attr:1,2,3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringFacetSelection {
    /// Facet attribute slug, e.g. `country`.
    pub slug: String,
    /// Selected value primary keys.
    pub value_ids: Vec<i64>,
}

/// A selection on one numeric facet: inclusive `[min, max]` range.
///
/// Wire form: `attr:20-21`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericFacetSelection {
    /// Facet attribute slug, e.g. `density`.
    pub slug: String,
    pub min: Decimal,
    pub max: Decimal,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Wire representation (`asc`/`desc`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sort field and direction. Wire form: `price-desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl Default for SortSpec {
    /// The catalog default: alphabetical by name.
    fn default() -> Self {
        SortSpec {
            field: "name".to_string(),
            order: SortOrder::Asc,
        }
    }
}

/// Validated filter/sort/paging parameters for one search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Category slug filter.
    pub category: Option<String>,
    /// Tag pks; a document must carry *every* listed tag (AND across tags).
    pub tags: Vec<i64>,
    /// Sale pks; a variant must carry any of them (OR within).
    pub sales: Vec<i64>,
    /// Collection pks; a variant must belong to any of them (OR within).
    pub collections: Vec<i64>,
    /// String facet selections.
    pub sfacets: Vec<StringFacetSelection>,
    /// Numeric facet range selections.
    pub nfacets: Vec<NumericFacetSelection>,
    /// Sort field and direction; defaults to name ascending.
    pub sort: Option<SortSpec>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Free-text query.
    pub q: Option<String>,
    /// Autocomplete prefix.
    pub prefix: Option<String>,
}

impl SearchParams {
    /// Create an empty parameter set (match-all, first page).
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective sort, falling back to the default.
    pub fn sort_spec(&self) -> SortSpec {
        self.sort.clone().unwrap_or_default()
    }

    /// Effective 1-based page number.
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Validate the parameter set, naming the offending field on failure.
    ///
    /// Invariants checked: page >= 1, numeric ranges have `min <= max`,
    /// facet selections name a non-blank slug and at least one value.
    pub fn validate(&self) -> Result<()> {
        if self.page == Some(0) {
            return Err(Error::validation("page", "page numbers start at 1"));
        }

        for selection in &self.sfacets {
            if selection.slug.trim().is_empty() {
                return Err(Error::validation("sfacets", "facet slug must not be blank"));
            }
            if selection.value_ids.is_empty() {
                return Err(Error::validation(
                    "sfacets",
                    format!("facet `{}` selects no values", selection.slug),
                ));
            }
        }

        for selection in &self.nfacets {
            if selection.slug.trim().is_empty() {
                return Err(Error::validation("nfacets", "facet slug must not be blank"));
            }
            if selection.min > selection.max {
                return Err(Error::validation(
                    "nfacets",
                    format!(
                        "facet `{}` range is inverted ({} > {})",
                        selection.slug, selection.min, selection.max
                    ),
                ));
            }
        }

        Ok(())
    }
}

impl FromStr for StringFacetSelection {
    type Err = Error;

    /// Parse the `attr:1,2,3` wire encoding.
    fn from_str(s: &str) -> Result<Self> {
        let (slug, values) = s
            .split_once(':')
            .ok_or_else(|| Error::validation("sfacets", format!("`{s}` is not `attr:ids`")))?;
        if slug.is_empty() {
            return Err(Error::validation("sfacets", "facet slug must not be blank"));
        }
        let value_ids = values
            .split(',')
            .map(|v| {
                v.parse::<i64>().map_err(|_| {
                    Error::validation("sfacets", format!("`{v}` is not a numeric value id"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if value_ids.is_empty() {
            return Err(Error::validation(
                "sfacets",
                format!("facet `{slug}` selects no values"),
            ));
        }
        Ok(StringFacetSelection {
            slug: slug.to_string(),
            value_ids,
        })
    }
}

impl FromStr for NumericFacetSelection {
    type Err = Error;

    /// Parse the `attr:min-max` wire encoding.
    fn from_str(s: &str) -> Result<Self> {
        let (slug, range) = s
            .split_once(':')
            .ok_or_else(|| Error::validation("nfacets", format!("`{s}` is not `attr:min-max`")))?;
        let (min, max) = range
            .split_once('-')
            .ok_or_else(|| Error::validation("nfacets", format!("`{range}` is not `min-max`")))?;
        let parse = |v: &str| {
            Decimal::from_str(v)
                .map_err(|_| Error::validation("nfacets", format!("`{v}` is not a number")))
        };
        let selection = NumericFacetSelection {
            slug: slug.to_string(),
            min: parse(min)?,
            max: parse(max)?,
        };
        if selection.min > selection.max {
            return Err(Error::validation(
                "nfacets",
                format!("facet `{slug}` range is inverted"),
            ));
        }
        Ok(selection)
    }
}

impl FromStr for SortSpec {
    type Err = Error;

    /// Parse the `field-asc` / `field-desc` wire encoding.
    fn from_str(s: &str) -> Result<Self> {
        let (field, order) = s
            .rsplit_once('-')
            .ok_or_else(|| Error::validation("sort", format!("`{s}` is not `field-direction`")))?;
        let order = match order {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => {
                return Err(Error::validation(
                    "sort",
                    format!("`{other}` is not `asc` or `desc`"),
                ));
            }
        };
        Ok(SortSpec {
            field: field.to_string(),
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_string_facet_selection() {
        let selection: StringFacetSelection = "country:15,16".parse().unwrap();
        assert_eq!(selection.slug, "country");
        assert_eq!(selection.value_ids, vec![15, 16]);
    }

    #[test]
    fn test_parse_string_facet_rejects_non_numeric() {
        let err = "country:abc".parse::<StringFacetSelection>().unwrap_err();
        assert!(matches!(err, Error::Validation { field, .. } if field == "sfacets"));
    }

    #[test]
    fn test_parse_numeric_facet_selection() {
        let selection: NumericFacetSelection = "density:20-21".parse().unwrap();
        assert_eq!(selection.slug, "density");
        assert_eq!(selection.min, dec!(20));
        assert_eq!(selection.max, dec!(21));

        let fractional: NumericFacetSelection = "strength:8.5-9.5".parse().unwrap();
        assert_eq!(fractional.min, dec!(8.5));
    }

    #[test]
    fn test_parse_numeric_facet_rejects_inverted_range() {
        assert!("density:21-20".parse::<NumericFacetSelection>().is_err());
    }

    #[test]
    fn test_parse_sort_spec() {
        let sort: SortSpec = "price-desc".parse().unwrap();
        assert_eq!(sort.field, "price");
        assert_eq!(sort.order, SortOrder::Desc);
        assert!("price-sideways".parse::<SortSpec>().is_err());
    }

    #[test]
    fn test_validate_names_offending_field() {
        let params = SearchParams {
            nfacets: vec![NumericFacetSelection {
                slug: "density".to_string(),
                min: dec!(21),
                max: dec!(20),
            }],
            ..SearchParams::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { field, .. } if field == "nfacets"));
    }

    #[test]
    fn test_validate_rejects_page_zero() {
        let params = SearchParams {
            page: Some(0),
            ..SearchParams::default()
        };
        assert!(params.validate().is_err());
        assert_eq!(SearchParams::new().page_number(), 1);
    }

    #[test]
    fn test_validate_rejects_empty_value_list() {
        let params = SearchParams {
            sfacets: vec![StringFacetSelection {
                slug: "country".to_string(),
                value_ids: vec![],
            }],
            ..SearchParams::default()
        };
        assert!(params.validate().is_err());
    }
}
