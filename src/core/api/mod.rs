//! Backend REST API access.
//!
//! Every tool that proxies the backend goes through [`ApiClient`], which owns
//! the bearer token, the base URL and the shared `reqwest` connection pool.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
