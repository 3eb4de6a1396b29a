//! Analysis result processing.
//!
//! Normalization of service responses and local statistics over the
//! resulting row table.

pub mod normalizer;
pub mod summary;

pub use normalizer::{apply_response, chart_from_response, Normalized};
pub use summary::{channel_distribution, group_by_stream, RowSummary};
