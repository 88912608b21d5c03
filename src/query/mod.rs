//! Query construction: boolean filter clauses and free-text queries.

pub mod filter;
pub mod fulltext;

pub use filter::{FilterClause, build_filter};
pub use fulltext::FullTextQuery;
