//! Anchorview: surrounding-document retrieval for time-ordered search indexes.
//!
//! Given one record (the anchor), fetch the N records immediately before and
//! after it in `(time, tie-breaker)` order, using an expanding ladder of time
//! windows and search-after pagination instead of offset scans.

pub mod cli;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod interval;
pub mod logging;
pub mod search;
pub mod sort;
pub mod time_codec;
pub mod types;

pub use context::{ContextSession, ContextSettings, ContextSnapshot, SectionStatus};
pub use dataset::Dataset;
pub use error::{ContextError, SearchError};
pub use search::SearchSource;
pub use sort::SortDirection;
