//! Crawler module for chapter discovery and content fetching
//!
//! This module contains the core crawling logic, including:
//! - Listing pagination and chapter-link extraction
//! - Chapter range selection
//! - Sequential content fetching with bounded retries
//!
//! [`discover`] and [`run_crawl`] tie a [`NovelSource`] to these pieces.

mod aggregator;
mod orchestrator;
mod range;

pub use aggregator::{
    extract_chapter_links, last_path_segment, ChapterListAggregator, ChapterListing, JsonListingEndpoint,
    ListingEndpoint, ListingStop, CHAPTER_MARKER,
};
pub use orchestrator::{failure_placeholder, CrawlOrchestrator, CrawlOutcome, BACKOFF_MULTIPLIER};
pub use range::ChapterRange;

use crate::config::Config;
use crate::model::{ChapterRef, NovelMetadata};
use crate::source::NovelSource;
use crate::{NovelError, Result};
use tokio_util::sync::CancellationToken;

/// Metadata and the selected chapter list, before any content is fetched
#[derive(Debug, Clone)]
pub struct Discovery {
    pub metadata: NovelMetadata,

    /// Chapters inside the requested range, in document order
    pub chapters: Vec<ChapterRef>,

    /// Number of chapters the listing produced before range selection
    pub listed: usize,

    pub range: ChapterRange,
}

/// A finished (or interrupted) crawl
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub metadata: NovelMetadata,
    pub outcome: CrawlOutcome,
}

/// Parses the landing page, lists chapters and applies the range
///
/// # Arguments
///
/// * `source` - The site adapter
/// * `url` - Novel landing-page URL
/// * `start`, `end` - Optional 1-based inclusive bounds
/// * `config` - Crawl configuration (listing delay)
///
/// # Returns
///
/// * `Ok(Discovery)` - Metadata plus the selected chapters
/// * `Err(NovelError)` - Metadata could not be resolved, the list is empty,
///   or the range is invalid
pub async fn discover(
    source: &dyn NovelSource,
    url: &str,
    start: Option<usize>,
    end: Option<usize>,
    config: &Config,
) -> Result<Discovery> {
    let metadata = source.parse_novel_url(url).await?;

    let chapters = source
        .list_chapters(&metadata, config.crawl.listing_delay())
        .await?;
    if chapters.is_empty() {
        return Err(NovelError::NoChapters {
            url: url.to_string(),
        });
    }

    let listed = chapters.len();
    let range = ChapterRange::from_bounds(start, end, listed)?;
    let chapters = range.apply(chapters)?;

    tracing::info!(
        "Selected chapters {}-{} of {} ({} to fetch)",
        range.start,
        range.end,
        listed,
        chapters.len()
    );

    Ok(Discovery {
        metadata,
        chapters,
        listed,
        range,
    })
}

/// Runs a complete crawl operation
///
/// This is the main entry point for crawling a novel. It will:
/// 1. Parse the landing page into metadata
/// 2. List the chapters and apply the range
/// 3. Fetch every selected chapter in order
///
/// Cancelling `cancel` during discovery fails with `Interrupted`. During the
/// content phase the records fetched so far are returned with the outcome
/// marked interrupted.
pub async fn run_crawl(
    source: &dyn NovelSource,
    url: &str,
    start: Option<usize>,
    end: Option<usize>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<CrawlResult> {
    tracing::info!("Starting crawl of {} via {}", url, source.name());

    let discovery = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(NovelError::Interrupted),
        discovery = discover(source, url, start, end, config) => discovery?,
    };

    let orchestrator = CrawlOrchestrator::from_config(&config.crawl).with_cancellation(cancel);
    let outcome = orchestrator.crawl(source, discovery.chapters).await;

    Ok(CrawlResult {
        metadata: discovery.metadata,
        outcome,
    })
}
