//! Typed scripted partial updates.
//!
//! Catalog renames, facet edits, and collection/sale membership changes are
//! applied in place across every matching document instead of reprojecting
//! whole families. Script bodies stay data (string templates with named
//! parameters), but callers only ever go through the constructors here;
//! nobody hand-assembles an update script. Every script checks before it
//! mutates, so replaying one under retry is harmless.

use rust_decimal::Decimal;
use serde_json::{Value, json};

use crate::document::{EntityRef, FacetDef, FacetValueRef, SaleRef, TagRef};

/// Which documents an update or delete targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocSelector {
    /// All variants of one family.
    Family(i64),
    /// One variant document.
    Variant(i64),
    /// An explicit variant set (sale membership changes).
    Variants(Vec<i64>),
    /// Documents in a category, by category pk.
    Category(i64),
    /// Documents of a manufacturer, by pk.
    Manufacturer(i64),
    /// Documents carrying a tag, by pk.
    Tag(i64),
    /// Documents carrying a string facet, by facet pk.
    StringFacet(i64),
    /// Documents carrying a specific string facet value.
    StringFacetValue { facet_pk: i64, value_pk: i64 },
    /// Documents carrying a numeric facet, by facet pk.
    NumberFacet(i64),
    /// Variants belonging to a collection.
    Collection(i64),
}

/// The typed mutation a script performs.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOp {
    SetCategory(EntityRef),
    SetManufacturer(EntityRef),
    RenameTag(TagRef),
    RemoveTag(i64),
    RenameStringFacet(FacetDef),
    RemoveStringFacet(i64),
    RenameStringFacetValue {
        facet_pk: i64,
        value: FacetValueRef,
    },
    RemoveStringFacetValue {
        facet_pk: i64,
        value_pk: i64,
    },
    RenameNumberFacet {
        facet: FacetDef,
        suffix: Option<String>,
    },
    RemoveNumberFacet(i64),
    AddCollection(i64),
    RemoveCollection(i64),
    /// Replace a variant's sales list and its denormalized prices, as
    /// recomputed by price resolution at write time.
    SetSales {
        sales: Vec<SaleRef>,
        price: Decimal,
        old_price: Option<Decimal>,
    },
}

/// A scripted update: target documents plus the mutation to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateScript {
    pub selector: DocSelector,
    pub op: ScriptOp,
}

/// A rendered script body for the document index: painless source plus
/// named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PainlessScript {
    pub source: &'static str,
    pub params: Value,
}

impl UpdateScript {
    /// Rewrite the embedded category on every document in it.
    pub fn update_category(category: EntityRef) -> Self {
        UpdateScript {
            selector: DocSelector::Category(category.pk),
            op: ScriptOp::SetCategory(category),
        }
    }

    /// Rewrite the embedded manufacturer on every document of it.
    pub fn update_manufacturer(manufacturer: EntityRef) -> Self {
        UpdateScript {
            selector: DocSelector::Manufacturer(manufacturer.pk),
            op: ScriptOp::SetManufacturer(manufacturer),
        }
    }

    /// Rename a tag across all documents that carry it.
    pub fn update_tag(tag: TagRef) -> Self {
        UpdateScript {
            selector: DocSelector::Tag(tag.pk),
            op: ScriptOp::RenameTag(tag),
        }
    }

    /// Remove a tag from all documents that carry it.
    pub fn remove_tag(tag_pk: i64) -> Self {
        UpdateScript {
            selector: DocSelector::Tag(tag_pk),
            op: ScriptOp::RemoveTag(tag_pk),
        }
    }

    /// Rename a string facet (name and slug) across all documents.
    pub fn update_string_facet(facet: FacetDef) -> Self {
        UpdateScript {
            selector: DocSelector::StringFacet(facet.pk),
            op: ScriptOp::RenameStringFacet(facet),
        }
    }

    /// Drop a string facet from all documents that carry it.
    pub fn remove_string_facet(facet_pk: i64) -> Self {
        UpdateScript {
            selector: DocSelector::StringFacet(facet_pk),
            op: ScriptOp::RemoveStringFacet(facet_pk),
        }
    }

    /// Rename one value of a string facet.
    pub fn update_string_facet_value(facet_pk: i64, value: FacetValueRef) -> Self {
        UpdateScript {
            selector: DocSelector::StringFacetValue {
                facet_pk,
                value_pk: value.pk,
            },
            op: ScriptOp::RenameStringFacetValue { facet_pk, value },
        }
    }

    /// Drop one value of a string facet.
    pub fn remove_string_facet_value(facet_pk: i64, value_pk: i64) -> Self {
        UpdateScript {
            selector: DocSelector::StringFacetValue { facet_pk, value_pk },
            op: ScriptOp::RemoveStringFacetValue { facet_pk, value_pk },
        }
    }

    /// Rename a numeric facet (name, slug, suffix) across all documents.
    pub fn update_number_facet(facet: FacetDef, suffix: Option<String>) -> Self {
        UpdateScript {
            selector: DocSelector::NumberFacet(facet.pk),
            op: ScriptOp::RenameNumberFacet { facet, suffix },
        }
    }

    /// Drop a numeric facet from all documents that carry it.
    pub fn remove_number_facet(facet_pk: i64) -> Self {
        UpdateScript {
            selector: DocSelector::NumberFacet(facet_pk),
            op: ScriptOp::RemoveNumberFacet(facet_pk),
        }
    }

    /// Add the given variants to a collection.
    pub fn add_to_collection(variant_pks: Vec<i64>, collection_pk: i64) -> Self {
        UpdateScript {
            selector: DocSelector::Variants(variant_pks),
            op: ScriptOp::AddCollection(collection_pk),
        }
    }

    /// Remove every current member variant from a collection.
    pub fn remove_collection(collection_pk: i64) -> Self {
        UpdateScript {
            selector: DocSelector::Collection(collection_pk),
            op: ScriptOp::RemoveCollection(collection_pk),
        }
    }

    /// Replace one variant's sales list and denormalized prices.
    pub fn set_variant_sales(
        variant_pk: i64,
        sales: Vec<SaleRef>,
        price: Decimal,
        old_price: Option<Decimal>,
    ) -> Self {
        UpdateScript {
            selector: DocSelector::Variant(variant_pk),
            op: ScriptOp::SetSales {
                sales,
                price,
                old_price,
            },
        }
    }

    /// Render the mutation as a painless script body.
    pub fn painless(&self) -> PainlessScript {
        self.op.painless()
    }
}

impl ScriptOp {
    /// Painless source and parameters for this mutation.
    ///
    /// Sources iterate and match on pk before touching anything, so a
    /// retried script finds nothing left to change.
    pub fn painless(&self) -> PainlessScript {
        match self {
            ScriptOp::SetCategory(category) => PainlessScript {
                source: "ctx._source.category = params.category",
                params: json!({ "category": category }),
            },
            ScriptOp::SetManufacturer(manufacturer) => PainlessScript {
                source: "ctx._source.manufacturer = params.manufacturer",
                params: json!({ "manufacturer": manufacturer }),
            },
            ScriptOp::RenameTag(tag) => PainlessScript {
                source: r#"
                    for (int i = 0; i < ctx._source.tags.length; ++i) {
                        if (ctx._source.tags[i]['pk'] == params.tag['pk']) {
                            ctx._source.tags[i] = params.tag;
                        }
                    }
                "#,
                params: json!({ "tag": tag }),
            },
            ScriptOp::RemoveTag(pk) => PainlessScript {
                source: r#"
                    for (int i = ctx._source.tags.length - 1; i >= 0; --i) {
                        if (ctx._source.tags[i]['pk'] == params.pk) {
                            ctx._source.tags.remove(i);
                        }
                    }
                "#,
                params: json!({ "pk": pk }),
            },
            ScriptOp::RenameStringFacet(facet) => PainlessScript {
                source: r#"
                    for (int i = 0; i < ctx._source.string_facets.length; ++i) {
                        if (ctx._source.string_facets[i]['pk'] == params.facet['pk']) {
                            ctx._source.string_facets[i]['name'] = params.facet['name'];
                            ctx._source.string_facets[i]['slug'] = params.facet['slug'];
                        }
                    }
                "#,
                params: json!({ "facet": facet }),
            },
            ScriptOp::RemoveStringFacet(pk) => PainlessScript {
                source: r#"
                    for (int i = ctx._source.string_facets.length - 1; i >= 0; --i) {
                        if (ctx._source.string_facets[i]['pk'] == params.pk) {
                            ctx._source.string_facets.remove(i);
                        }
                    }
                "#,
                params: json!({ "pk": pk }),
            },
            ScriptOp::RenameStringFacetValue { facet_pk, value } => PainlessScript {
                source: r#"
                    for (int i = 0; i < ctx._source.string_facets.length; ++i) {
                        if (ctx._source.string_facets[i]['pk'] == params.facet_pk) {
                            for (int j = 0; j < ctx._source.string_facets[i].values.length; ++j) {
                                if (ctx._source.string_facets[i].values[j]['pk'] == params.value['pk']) {
                                    ctx._source.string_facets[i].values[j]['name'] = params.value['name'];
                                }
                            }
                        }
                    }
                "#,
                params: json!({ "facet_pk": facet_pk, "value": value }),
            },
            ScriptOp::RemoveStringFacetValue { facet_pk, value_pk } => PainlessScript {
                source: r#"
                    for (int i = 0; i < ctx._source.string_facets.length; ++i) {
                        if (ctx._source.string_facets[i]['pk'] == params.facet_pk) {
                            for (int j = ctx._source.string_facets[i].values.length - 1; j >= 0; --j) {
                                if (ctx._source.string_facets[i].values[j]['pk'] == params.value_pk) {
                                    ctx._source.string_facets[i].values.remove(j);
                                }
                            }
                        }
                    }
                "#,
                params: json!({ "facet_pk": facet_pk, "value_pk": value_pk }),
            },
            ScriptOp::RenameNumberFacet { facet, suffix } => PainlessScript {
                source: r#"
                    for (int i = 0; i < ctx._source.number_facets.length; ++i) {
                        if (ctx._source.number_facets[i]['pk'] == params.facet['pk']) {
                            ctx._source.number_facets[i]['name'] = params.facet['name'];
                            ctx._source.number_facets[i]['slug'] = params.facet['slug'];
                            ctx._source.number_facets[i]['suffix'] = params.suffix;
                        }
                    }
                "#,
                params: json!({ "facet": facet, "suffix": suffix }),
            },
            ScriptOp::RemoveNumberFacet(pk) => PainlessScript {
                source: r#"
                    for (int i = ctx._source.number_facets.length - 1; i >= 0; --i) {
                        if (ctx._source.number_facets[i]['pk'] == params.pk) {
                            ctx._source.number_facets.remove(i);
                        }
                    }
                "#,
                params: json!({ "pk": pk }),
            },
            ScriptOp::AddCollection(pk) => PainlessScript {
                source: r#"
                    if (!ctx._source.variant.collections.contains(params.pk)) {
                        ctx._source.variant.collections.add(params.pk);
                    }
                "#,
                params: json!({ "pk": pk }),
            },
            ScriptOp::RemoveCollection(pk) => PainlessScript {
                source: r#"
                    if (ctx._source.variant.collections.contains(params.pk)) {
                        ctx._source.variant.collections.remove(
                            ctx._source.variant.collections.indexOf(params.pk));
                    }
                "#,
                params: json!({ "pk": pk }),
            },
            ScriptOp::SetSales {
                sales,
                price,
                old_price,
            } => PainlessScript {
                source: r#"
                    ctx._source.variant.sales = params.sales;
                    ctx._source.variant.price = params.price;
                    ctx._source.variant.old_price = params.old_price;
                "#,
                params: json!({ "sales": sales, "price": price, "old_price": old_price }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_constructors_pair_selector_and_op() {
        let script = UpdateScript::remove_tag(7);
        assert_eq!(script.selector, DocSelector::Tag(7));
        assert_eq!(script.op, ScriptOp::RemoveTag(7));

        let script = UpdateScript::add_to_collection(vec![1, 2], 9);
        assert_eq!(script.selector, DocSelector::Variants(vec![1, 2]));
        assert_eq!(script.op, ScriptOp::AddCollection(9));
    }

    #[test]
    fn test_set_sales_painless_params() {
        let script = UpdateScript::set_variant_sales(
            5,
            vec![SaleRef {
                pk: 3,
                name: "spring".to_string(),
            }],
            dec!(760),
            Some(dec!(950)),
        );
        let rendered = script.painless();
        assert!(rendered.source.contains("ctx._source.variant.price = params.price"));
        assert_eq!(rendered.params["price"], serde_json::json!(760.0));
        assert_eq!(rendered.params["sales"][0]["pk"], serde_json::json!(3));
    }

    #[test]
    fn test_rename_tag_painless_matches_on_pk() {
        let rendered = UpdateScript::update_tag(TagRef {
            pk: 4,
            name: "craft".to_string(),
        })
        .painless();
        assert!(rendered.source.contains("tags[i]['pk'] == params.tag['pk']"));
        assert_eq!(rendered.params["tag"]["name"], serde_json::json!("craft"));
    }
}
