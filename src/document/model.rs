//! Typed shapes for the product search index and its catalog-side input.
//!
//! [`ProductDocument`] is the flat, denormalized document stored in the
//! index: exactly one per *active* variant, embedding the shared family
//! data plus that variant's own fields. [`ProductFamily`] is the canonical
//! catalog record handed over by the (out-of-scope) persistence layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::price::Sale;

/// A named entity reference (manufacturer, category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub pk: i64,
    pub name: String,
    pub slug: String,
}

/// A tag reference embedded in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub pk: i64,
    pub name: String,
}

/// A string facet definition (attribute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDef {
    pub pk: i64,
    pub slug: String,
    pub name: String,
}

/// One enumerated value of a string facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValueRef {
    pub pk: i64,
    pub name: String,
}

/// A string facet with its values, as embedded in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringFacetGroup {
    pub pk: i64,
    pub slug: String,
    pub name: String,
    pub values: Vec<FacetValueRef>,
}

/// A numeric facet entry: continuous value with a display suffix.
///
/// The value is stored at full precision; trailing-zero trimming and
/// integer-vs-decimal rendering happen only in the result formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFacetEntry {
    pub pk: i64,
    pub slug: String,
    pub name: String,
    pub suffix: Option<String>,
    pub value: Decimal,
}

/// A sale reference carried on an indexed variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRef {
    pub pk: i64,
    pub name: String,
}

/// Variant fields embedded in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDoc {
    pub pk: i64,
    pub sku: i64,
    /// Package measure, e.g. `750` or `0.75`.
    pub measure: String,
    /// Unit of the measure, e.g. `ml` or `l`.
    pub measure_unit: String,
    pub base_price: Decimal,
    /// Resolved display price (write-time denormalization of sales).
    pub price: Decimal,
    /// Pre-sale price, present only while a sale changes the price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_price: Option<Decimal>,
    pub stock_balance: i64,
    pub package_amount: i64,
    pub images: Vec<String>,
    /// Collection membership; mutated via targeted partial updates.
    pub collections: Vec<i64>,
    /// Active sales; mutated via targeted partial updates.
    pub sales: Vec<SaleRef>,
}

/// One flat search document, keyed by variant pk in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    pub family_pk: i64,
    pub name: String,
    pub name_slug: String,
    pub description: String,
    pub manufacturer: EntityRef,
    pub category: EntityRef,
    pub tags: Vec<TagRef>,
    pub string_facets: Vec<StringFacetGroup>,
    pub number_facets: Vec<NumberFacetEntry>,
    pub variant: VariantDoc,
    /// Total active variant count for the family.
    pub count_instances: u32,
    /// Prefix-autocomplete source: name + manufacturer name.
    pub completion: String,
    /// Locale-aware full-text concatenation.
    pub fulltext_locale: String,
    /// Phonetic full-text source (analyzed engine-side).
    pub fulltext_phonetic: String,
    pub created_at: DateTime<Utc>,
}

impl ProductDocument {
    /// Index document id for this variant.
    pub fn doc_id(&self) -> String {
        self.variant.pk.to_string()
    }
}

/// Variant lifecycle status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    Active,
    Draft,
    Archive,
}

/// One purchasable SKU under a product family, as the catalog stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub pk: i64,
    pub sku: i64,
    pub measure: String,
    pub measure_unit: String,
    pub base_price: Decimal,
    pub stock_balance: i64,
    pub package_amount: i64,
    pub images: Vec<String>,
    pub collections: Vec<i64>,
    pub sales: Vec<Sale>,
    pub status: VariantStatus,
}

impl Variant {
    /// Whether this variant belongs in the index.
    pub fn is_active(&self) -> bool {
        self.status == VariantStatus::Active
    }
}

/// A (facet, value) pair as the catalog's many-to-many join delivers it.
///
/// Input may arrive as a flat list in any order; projection groups pairs by
/// facet pk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringFacetAssignment {
    pub facet: FacetDef,
    pub value: FacetValueRef,
}

/// A product family with its variants and resolved relations, as handed over
/// by the catalog layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFamily {
    pub pk: i64,
    pub name: String,
    pub name_slug: String,
    pub description: String,
    /// Transliterated/localized product name, for locale-aware search.
    pub name_locale: String,
    /// Localized style/type description, for locale-aware search.
    pub style_locale: String,
    pub manufacturer: EntityRef,
    pub category: EntityRef,
    pub tags: Vec<TagRef>,
    pub sfacets: Vec<StringFacetAssignment>,
    pub nfacets: Vec<NumberFacetEntry>,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
}
