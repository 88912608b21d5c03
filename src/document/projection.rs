//! Projection of catalog families into flat search documents.
//!
//! A family with two active variants fans out into two documents, each
//! embedding the shared family data plus its own variant fields. Inactive
//! and archived variants produce no document at all; the caller removes any
//! previously-indexed document on a status transition.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::document::model::{
    FacetValueRef, ProductDocument, ProductFamily, SaleRef, StringFacetGroup, Variant, VariantDoc,
};
use crate::price::resolve_price;

/// Project a family into one document per active variant.
///
/// `now` anchors sale-price resolution; the resolved price is stored on the
/// document (write-time denormalization) and later kept current via targeted
/// partial updates, not full reprojection.
pub fn project_family(family: &ProductFamily, now: DateTime<Utc>) -> Vec<ProductDocument> {
    let string_facets = group_string_facets(family);
    let fulltext_locale = build_fulltext_locale(family, &string_facets);
    let completion = format!("{} {}", family.name, family.manufacturer.name);
    let fulltext_phonetic = completion.clone();

    let active: Vec<&Variant> = family.variants.iter().filter(|v| v.is_active()).collect();
    let count_instances = active.len() as u32;

    active
        .iter()
        .map(|variant| ProductDocument {
            family_pk: family.pk,
            name: family.name.clone(),
            name_slug: family.name_slug.clone(),
            description: family.description.clone(),
            manufacturer: family.manufacturer.clone(),
            category: family.category.clone(),
            tags: family.tags.clone(),
            string_facets: string_facets.clone(),
            number_facets: family.nfacets.clone(),
            variant: project_variant(variant, now),
            count_instances,
            completion: completion.clone(),
            fulltext_locale: fulltext_locale.clone(),
            fulltext_phonetic: fulltext_phonetic.clone(),
            created_at: family.created_at,
        })
        .collect()
}

/// Project the variant-owned fields, resolving the sale price at `now`.
pub fn project_variant(variant: &Variant, now: DateTime<Utc>) -> VariantDoc {
    let active_sales: Vec<_> = variant
        .sales
        .iter()
        .filter(|sale| sale.is_active(now))
        .cloned()
        .collect();
    let resolved = resolve_price(variant.base_price, &active_sales, now);

    VariantDoc {
        pk: variant.pk,
        sku: variant.sku,
        measure: variant.measure.clone(),
        measure_unit: variant.measure_unit.clone(),
        base_price: variant.base_price,
        price: resolved.price,
        old_price: resolved.old_price,
        stock_balance: variant.stock_balance,
        package_amount: variant.package_amount,
        images: variant.images.clone(),
        collections: variant.collections.clone(),
        sales: active_sales
            .iter()
            .map(|sale| SaleRef {
                pk: sale.pk,
                name: sale.name.clone(),
            })
            .collect(),
    }
}

/// Group the flat (facet, value) assignment pairs by facet.
///
/// Accumulates into a map keyed by facet pk, with no reliance on the input list
/// arriving sorted. Values are deduplicated per facet and the output is
/// ordered by facet pk for deterministic documents.
fn group_string_facets(family: &ProductFamily) -> Vec<StringFacetGroup> {
    let mut groups: BTreeMap<i64, StringFacetGroup> = BTreeMap::new();
    for assignment in &family.sfacets {
        let group = groups
            .entry(assignment.facet.pk)
            .or_insert_with(|| StringFacetGroup {
                pk: assignment.facet.pk,
                slug: assignment.facet.slug.clone(),
                name: assignment.facet.name.clone(),
                values: Vec::new(),
            });
        if !group.values.iter().any(|v| v.pk == assignment.value.pk) {
            group.values.push(FacetValueRef {
                pk: assignment.value.pk,
                name: assignment.value.name.clone(),
            });
        }
    }
    groups.into_values().collect()
}

/// Locale-aware full-text field: locale name + locale style + tag names +
/// all string-facet value names + category name.
fn build_fulltext_locale(family: &ProductFamily, string_facets: &[StringFacetGroup]) -> String {
    let mut parts = vec![family.name_locale.clone(), family.style_locale.clone()];
    parts.extend(family.tags.iter().map(|tag| tag.name.clone()));
    for group in string_facets {
        parts.extend(group.values.iter().map(|value| value.name.clone()));
    }
    parts.push(family.category.name.clone());
    parts.retain(|part| !part.is_empty());
    parts.join(" ")
}
