//! # Domain Layer
//!
//! Output classification, the record index, record queries and indexing
//! errors.

pub mod classify;
pub mod errors;
pub mod index;
pub mod query;

pub use classify::*;
pub use errors::*;
pub use index::{IndexerStats, RecordIndex};
pub use query::{JigQuery, SortOrder, DEFAULT_QUERY_LIMIT};
