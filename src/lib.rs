//! Novelsmith: a polite serialized-fiction crawler
//!
//! This crate fetches novels from paginated web sources chapter by chapter,
//! normalizes each chapter's markup into plain paragraphs, and hands the
//! ordered result to a document sink (an EPUB writer by default).

pub mod config;
pub mod crawler;
pub mod html;
pub mod http;
pub mod model;
pub mod output;
pub mod source;
pub mod state;

use thiserror::Error;

/// Main error type for Novelsmith operations
#[derive(Debug, Error)]
pub enum NovelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("No novel metadata found at {url}")]
    MetadataNotFound { url: String },

    #[error("Novel ID not found at {url}")]
    IdNotFound { url: String },

    #[error("Total chapter count not found at {url}")]
    ChapterCountNotFound { url: String },

    #[error("Chapter content not found at {url}")]
    ContentNotFound { url: String },

    #[error("No chapters found for {url}")]
    NoChapters { url: String },

    #[error("Invalid chapter range {start}..={end} (total {total})")]
    InvalidRange { start: usize, end: usize, total: usize },

    #[error("Interrupted before any chapter was fetched")]
    Interrupted,

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NovelError {
    /// Returns true for transport-level failures (timeout, connection, non-2xx)
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Timeout { .. } | Self::Status { .. }
        )
    }

    /// Returns true if the run cannot continue without the missing data
    pub fn is_fatal_metadata(&self) -> bool {
        matches!(
            self,
            Self::MetadataNotFound { .. } | Self::IdNotFound { .. } | Self::ChapterCountNotFound { .. }
        )
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Novelsmith operations
pub type Result<T> = std::result::Result<T, NovelError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{ChapterRecord, ChapterRef, FetchStatus, NovelMetadata};
pub use source::{NovelSource, SourceKind};
pub use state::ChapterState;
