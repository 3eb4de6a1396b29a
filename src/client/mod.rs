//! HTTP client for the analysis proxy.

pub mod analysis_client;

pub use analysis_client::{AnalysisClient, UploadFile, ANALYZE_ROUTE, REANALYZE_ROUTE};
