//! HTTP transport: a tuned `reqwest` client plus the generic retry engine
//! every request goes through.

pub mod client;
pub mod retry;

pub use client::Client;
pub use retry::{retry, RetryConfig};
