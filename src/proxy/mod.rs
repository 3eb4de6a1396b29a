//! Reverse-proxy endpoints for the analysis service.

pub mod server;

pub use server::serve;
