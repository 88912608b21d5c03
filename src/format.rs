//! Result formatting: raw hits and aggregation buckets into the API shapes
//! the calling layer returns verbatim.
//!
//! Everything here is pure. Prices and numeric facet values are display-
//! normalized at this point and nowhere earlier; documents store full
//! precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::{EntityRef, ProductDocument, SaleRef, StringFacetGroup, TagRef};
use crate::error::{Error, Result};
use crate::executor::{
    CategoryBucket, FacetAggregations, NumberFacetBucket, SearchHit, SearchPage,
    StringFacetBucket, ValueBucket,
};
use crate::price::format_price;

/// A numeric facet entry with its display-normalized value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFacetView {
    pub pk: i64,
    pub slug: String,
    pub name: String,
    pub suffix: Option<String>,
    /// Integral values render without decimals, fractional ones trimmed of
    /// trailing zeros.
    pub value: String,
}

/// A variant with display-formatted prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantView {
    pub pk: i64,
    pub sku: i64,
    pub measure: String,
    pub measure_unit: String,
    pub base_price: String,
    pub price: String,
    /// Present only while a sale changes the price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_price: Option<String>,
    pub stock_balance: i64,
    pub package_amount: i64,
    pub images: Vec<String>,
    pub collections: Vec<i64>,
    pub sales: Vec<SaleRef>,
}

/// One product in a listing: shared family data plus its variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductItem {
    /// Document id (variant pk).
    pub pk: String,
    pub family_pk: i64,
    pub name: String,
    pub name_slug: String,
    pub description: String,
    pub manufacturer: EntityRef,
    pub category: EntityRef,
    pub tags: Vec<TagRef>,
    pub string_facets: Vec<StringFacetGroup>,
    pub number_facets: Vec<NumberFacetView>,
    pub variant: VariantView,
}

/// A listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
    pub items: Vec<ProductItem>,
    pub total: u64,
}

/// One product family with all its variants grouped under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub pk: i64,
    pub name: String,
    pub name_slug: String,
    pub description: String,
    pub manufacturer: EntityRef,
    pub category: EntityRef,
    pub tags: Vec<TagRef>,
    pub string_facets: Vec<StringFacetGroup>,
    pub number_facets: Vec<NumberFacetView>,
    pub instances: Vec<VariantView>,
    pub count_instances: usize,
}

/// The facet summary object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    pub sfacets: Vec<StringFacetBucket>,
    pub nfacets: Vec<NumberFacetBucket>,
}

/// A category landing-page summary.
pub type CategorySummary = CategoryBucket;

/// Display-normalize a numeric facet value: `22.0` → `22`, `9.50` → `9.5`.
pub fn format_facet_value(value: Decimal) -> String {
    value.normalize().to_string()
}

fn format_number_facets(document: &ProductDocument) -> Vec<NumberFacetView> {
    document
        .number_facets
        .iter()
        .map(|entry| NumberFacetView {
            pk: entry.pk,
            slug: entry.slug.clone(),
            name: entry.name.clone(),
            suffix: entry.suffix.clone(),
            value: format_facet_value(entry.value),
        })
        .collect()
}

fn format_variant(document: &ProductDocument) -> VariantView {
    let variant = &document.variant;
    VariantView {
        pk: variant.pk,
        sku: variant.sku,
        measure: variant.measure.clone(),
        measure_unit: variant.measure_unit.clone(),
        base_price: format_price(variant.base_price),
        price: format_price(variant.price),
        old_price: variant.old_price.map(format_price),
        stock_balance: variant.stock_balance,
        package_amount: variant.package_amount,
        images: variant.images.clone(),
        collections: variant.collections.clone(),
        sales: variant.sales.clone(),
    }
}

/// Shape one hit into a listing item.
pub fn format_product_item(hit: &SearchHit) -> ProductItem {
    let document = &hit.document;
    ProductItem {
        pk: hit.id.clone(),
        family_pk: document.family_pk,
        name: document.name.clone(),
        name_slug: document.name_slug.clone(),
        description: document.description.clone(),
        manufacturer: document.manufacturer.clone(),
        category: document.category.clone(),
        tags: document.tags.clone(),
        string_facets: document.string_facets.clone(),
        number_facets: format_number_facets(document),
        variant: format_variant(document),
    }
}

/// Shape a result page into the `{items, total}` listing contract.
pub fn format_product_list(page: &SearchPage) -> ProductList {
    ProductList {
        items: page.hits.iter().map(format_product_item).collect(),
        total: page.total,
    }
}

/// Group one family's documents into a single detail record.
///
/// Empty input is a missed point lookup, not an empty listing.
pub fn format_product_detail(hits: &[SearchHit]) -> Result<ProductDetail> {
    let first = hits
        .first()
        .ok_or_else(|| Error::not_found("product family has no indexed variants"))?;
    let document = &first.document;

    let mut instances: Vec<VariantView> = hits.iter().map(|hit| format_variant(&hit.document)).collect();
    instances.sort_by_key(|variant| variant.pk);

    Ok(ProductDetail {
        pk: document.family_pk,
        name: document.name.clone(),
        name_slug: document.name_slug.clone(),
        description: document.description.clone(),
        manufacturer: document.manufacturer.clone(),
        category: document.category.clone(),
        tags: document.tags.clone(),
        string_facets: document.string_facets.clone(),
        number_facets: format_number_facets(document),
        count_instances: instances.len(),
        instances,
    })
}

/// Overwrite one attribute's value buckets with its sibling recomputation.
///
/// Attributes absent from the primary aggregation are left untouched; the
/// primary result defines the facet list.
pub fn overlay_sibling_values(
    aggregations: &mut FacetAggregations,
    slug: &str,
    values: Vec<ValueBucket>,
) {
    if let Some(bucket) = aggregations
        .string_facets
        .iter_mut()
        .find(|bucket| bucket.slug == slug)
    {
        bucket.values = values;
    }
}

/// Shape the aggregation result into the `{sfacets, nfacets}` contract.
pub fn format_facets(aggregations: FacetAggregations) -> Facets {
    Facets {
        sfacets: aggregations.string_facets,
        nfacets: aggregations.number_facets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NumberFacetEntry, VariantDoc};
    use crate::executor::Stats;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn document(family_pk: i64, variant_pk: i64, price: Decimal) -> ProductDocument {
        ProductDocument {
            family_pk,
            name: "Abbaye Des Rocs Grand Cru".to_string(),
            name_slug: "abbaye-des-rocs-grand-cru".to_string(),
            description: String::new(),
            manufacturer: EntityRef {
                pk: 1,
                name: "Ayinger".to_string(),
                slug: "ayinger".to_string(),
            },
            category: EntityRef {
                pk: 1,
                name: "Beer".to_string(),
                slug: "beer".to_string(),
            },
            tags: vec![],
            string_facets: vec![],
            number_facets: vec![
                NumberFacetEntry {
                    pk: 1,
                    slug: "density".to_string(),
                    name: "Density".to_string(),
                    suffix: Some("%".to_string()),
                    value: dec!(22.0),
                },
                NumberFacetEntry {
                    pk: 2,
                    slug: "strength".to_string(),
                    name: "Strength".to_string(),
                    suffix: Some("%".to_string()),
                    value: dec!(9.50),
                },
            ],
            variant: VariantDoc {
                pk: variant_pk,
                sku: 8974383,
                measure: "750".to_string(),
                measure_unit: "ml".to_string(),
                base_price: dec!(950.00),
                price,
                old_price: (price != dec!(950.00)).then_some(dec!(950.00)),
                stock_balance: 751,
                package_amount: 5,
                images: vec![],
                collections: vec![],
                sales: vec![],
            },
            count_instances: 1,
            completion: String::new(),
            fulltext_locale: String::new(),
            fulltext_phonetic: String::new(),
            created_at: Utc::now(),
        }
    }

    fn hit(family_pk: i64, variant_pk: i64, price: Decimal) -> SearchHit {
        SearchHit {
            id: variant_pk.to_string(),
            document: document(family_pk, variant_pk, price),
        }
    }

    #[test]
    fn test_format_product_list_normalizes_display_values() {
        let page = SearchPage {
            total: 1,
            hits: vec![hit(1, 11, dec!(760.0))],
        };
        let list = format_product_list(&page);
        assert_eq!(list.total, 1);
        let item = &list.items[0];
        assert_eq!(item.pk, "11");
        assert_eq!(item.variant.price, "760");
        assert_eq!(item.variant.old_price.as_deref(), Some("950"));
        // 22.0 -> "22", 9.50 -> "9.5"
        assert_eq!(item.number_facets[0].value, "22");
        assert_eq!(item.number_facets[1].value, "9.5");
    }

    #[test]
    fn test_format_product_detail_groups_variants() {
        let hits = vec![
            hit(2, 13, dec!(950.00)),
            hit(2, 12, dec!(950.00)),
        ];
        let detail = format_product_detail(&hits).unwrap();
        assert_eq!(detail.pk, 2);
        assert_eq!(detail.count_instances, 2);
        // Instances ordered by variant pk regardless of hit order.
        assert_eq!(detail.instances[0].pk, 12);
        assert_eq!(detail.instances[1].pk, 13);
    }

    #[test]
    fn test_format_product_detail_empty_is_not_found() {
        let err = format_product_detail(&[]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_overlay_sibling_values_replaces_only_named_facet() {
        let mut aggregations = FacetAggregations {
            string_facets: vec![
                StringFacetBucket {
                    pk: 5,
                    slug: "country".to_string(),
                    name: "Country".to_string(),
                    values: vec![ValueBucket {
                        pk: 15,
                        name: "Germany".to_string(),
                        count: 1,
                    }],
                },
                StringFacetBucket {
                    pk: 2,
                    slug: "taste".to_string(),
                    name: "Taste".to_string(),
                    values: vec![],
                },
            ],
            number_facets: vec![],
        };
        overlay_sibling_values(
            &mut aggregations,
            "country",
            vec![
                ValueBucket {
                    pk: 15,
                    name: "Germany".to_string(),
                    count: 1,
                },
                ValueBucket {
                    pk: 16,
                    name: "Belgium".to_string(),
                    count: 2,
                },
            ],
        );
        assert_eq!(aggregations.string_facets[0].values.len(), 2);
        assert!(aggregations.string_facets[1].values.is_empty());

        // Unknown attribute: primary result defines the facet list.
        overlay_sibling_values(&mut aggregations, "style", vec![]);
        assert_eq!(aggregations.string_facets.len(), 2);
    }

    #[test]
    fn test_format_facets_contract() {
        let facets = format_facets(FacetAggregations {
            string_facets: vec![],
            number_facets: vec![NumberFacetBucket {
                pk: 1,
                slug: "density".to_string(),
                name: "Density".to_string(),
                suffix: Some("%".to_string()),
                stats: Stats {
                    min: Some(dec!(20)),
                    max: Some(dec!(20)),
                },
                total_stats: Stats {
                    min: Some(dec!(20)),
                    max: Some(dec!(22)),
                },
            }],
        });
        assert_eq!(facets.nfacets[0].total_stats.max, Some(dec!(22)));
        assert_eq!(facets.nfacets[0].stats.max, Some(dec!(20)));
    }
}
