use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Main configuration structure for Novelsmith
///
/// Every section and key is optional; missing values fall back to the
/// documented defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Crawl pacing and content-cleaning configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Sleep after each successfully fetched chapter (milliseconds).
    /// Failed attempts back off for twice this value.
    #[serde(rename = "chapter-delay-ms")]
    pub chapter_delay_ms: u64,

    /// Sleep between listing pages (milliseconds)
    #[serde(rename = "listing-delay-ms")]
    pub listing_delay_ms: u64,

    /// Total attempts per chapter before it is marked as failed
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Number of chapters the listing endpoint returns per page
    #[serde(rename = "chapters-per-page")]
    pub chapters_per_page: u32,

    /// Case-insensitive id/class fragments marking advertisement containers
    #[serde(rename = "ad-patterns")]
    pub ad_patterns: Vec<String>,
}

impl CrawlConfig {
    pub fn chapter_delay(&self) -> Duration {
        Duration::from_millis(self.chapter_delay_ms)
    }

    pub fn listing_delay(&self) -> Duration {
        Duration::from_millis(self.listing_delay_ms)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            chapter_delay_ms: 1000,
            listing_delay_ms: 500,
            max_retries: 3,
            chapters_per_page: 100,
            ad_patterns: vec!["ads".to_string(), "banner".to_string()],
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the finished e-book is written to
    pub directory: String,

    /// Language code recorded in the e-book metadata
    pub language: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            language: "vi".to_string(),
        }
    }
}
