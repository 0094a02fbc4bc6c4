//! Novel sources
//!
//! Each supported website is one [`NovelSource`] implementation carrying that
//! site's selectors, ID-discovery heuristics and listing strategy. Sources are
//! self-contained: each owns its HTTP session and shares no mutable state.
//!
//! [`SourceKind`] is the registry of available sources.

pub mod landing;
mod metruyenchu;
mod metruyenhot;

pub use metruyenchu::MetruyenchuSource;
pub use metruyenhot::MetruyenhotSource;

use crate::config::Config;
use crate::model::{ChapterRef, FetchedChapter, NovelMetadata};
use crate::{NovelError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Capability set every website adapter provides
#[async_trait]
pub trait NovelSource: Send + Sync {
    /// Human-readable source name (the site's host)
    fn name(&self) -> &'static str;

    /// Fetches the landing page and builds the novel's metadata
    ///
    /// Fails when a field the site needs for crawling (title signal, ID,
    /// chapter count) cannot be found. Cover download failures are not errors.
    async fn parse_novel_url(&self, url: &str) -> Result<NovelMetadata>;

    /// Produces the ordered chapter list
    ///
    /// `delay` is the pause between listing requests for paginated sources.
    async fn list_chapters(&self, metadata: &NovelMetadata, delay: Duration) -> Result<Vec<ChapterRef>>;

    /// Fetches one chapter page and returns its normalized content
    async fn fetch_chapter_content(&self, url: &str) -> Result<FetchedChapter>;
}

/// Registry of supported websites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// metruyenchu.com.vn - JSON listing endpoint
    Metruyenchu,
    /// metruyenhot.me - sequentially numbered chapter URLs
    Metruyenhot,
}

impl SourceKind {
    /// Returns all registered sources in menu order
    pub fn all() -> &'static [SourceKind] {
        &[Self::Metruyenchu, Self::Metruyenhot]
    }

    /// Short key accepted on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Self::Metruyenchu => "metruyenchu",
            Self::Metruyenhot => "metruyenhot",
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            Self::Metruyenchu => "metruyenchu.com.vn",
            Self::Metruyenhot => "metruyenhot.me",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Metruyenchu => "Mê Truyện Chữ",
            Self::Metruyenhot => "Mê Truyện Hot",
        }
    }

    /// Looks a source up by key, host, or 1-based menu number
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        if let Ok(number) = key.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|i| Self::all().get(i))
                .copied();
        }
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.key() == key || kind.host() == key)
    }

    /// Picks the source whose host matches the novel URL
    pub fn detect(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        Self::all()
            .iter()
            .copied()
            .find(|kind| host == kind.host() || host.ends_with(&format!(".{}", kind.host())))
    }

    /// Builds the adapter with its own HTTP session
    pub fn build(&self, config: &Config) -> Result<Box<dyn NovelSource>> {
        Ok(match self {
            Self::Metruyenchu => Box::new(MetruyenchuSource::new(config)?),
            Self::Metruyenhot => Box::new(MetruyenhotSource::new(config)?),
        })
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host())
    }
}

impl FromStr for SourceKind {
    type Err = NovelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s).ok_or_else(|| NovelError::UnknownSource(s.to_string()))
    }
}
