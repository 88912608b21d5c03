//! Search document model and catalog-to-document projection.

pub mod model;
pub mod projection;

pub use model::{
    EntityRef, FacetDef, FacetValueRef, NumberFacetEntry, ProductDocument, ProductFamily, SaleRef,
    StringFacetAssignment, StringFacetGroup, TagRef, Variant, VariantDoc, VariantStatus,
};
pub use projection::{project_family, project_variant};
