//! Observable application state.

pub mod observable;
pub mod store;

pub use store::AnalysisStateStore;
