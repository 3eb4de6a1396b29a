//! Report rendering of the analysis state.

pub mod generator;

pub use generator::{build_report, generate_json_report, generate_markdown_report};
