//! Configuration module for Novelsmith
//!
//! Defaults for headers, timeouts, delays and retry bounds live in an explicit
//! [`Config`] that is passed into each component at construction. A TOML file
//! can override any subset of them.
//!
//! # Example
//!
//! ```no_run
//! use novelsmith::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("novelsmith.toml")).unwrap();
//! println!("Chapter delay: {}ms", config.crawl.chapter_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, HttpConfig, OutputConfig, DEFAULT_USER_AGENT};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
