//! Concurrent batch query pipeline for ClinVar-style Entrez search/summary
//! downloads: rate-limited search→summary fetching, content-addressed
//! resumable caching, and streaming spreadsheet output.

pub mod atomic;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod filters;
pub mod http;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod rate_limiter;
pub mod types;
pub mod wire;

pub use error::PipelineError;
pub use executor::QueryExecutor;
pub use query::Query;
