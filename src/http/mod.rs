//! HTTP client wrapper
//!
//! Issues GET requests with default headers and a timeout, and raises a typed
//! failure on non-success status or network error.

mod client;

pub use client::{build_http_client, HttpClient};
