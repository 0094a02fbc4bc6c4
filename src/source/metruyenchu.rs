//! metruyenchu.com.vn adapter
//!
//! The landing page carries the numeric novel ID and the chapter total; the
//! chapter list comes from the JSON listing endpoint, paginated in pages of
//! `chapters_per_page`.

use crate::config::Config;
use crate::crawler::{ChapterListAggregator, JsonListingEndpoint};
use crate::html::extractor::{collapse_text, parse_selector, select_attr, select_first, select_text};
use crate::html::{extract_container, ContentNormalizer};
use crate::http::HttpClient;
use crate::model::{listing_page_cap, ChapterRef, FetchedChapter, NovelMetadata};
use crate::source::landing::{
    discover_novel_id, download_cover, first_number, locate_novel, resolve_url, title_or_slug,
    NovelLocation, UNKNOWN_AUTHOR,
};
use crate::source::NovelSource;
use crate::{NovelError, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use std::time::Duration;

const TITLE_SELECTORS: &[&str] = &["h1[itemprop='name']", "h1"];
const AUTHOR_SELECTORS: &[&str] = &["a[itemprop='author']", "a[href*='/tac-gia/']"];
const CONTENT_SELECTORS: &[&str] = &[
    "div.truyen",
    "div#chapter-content",
    "div.chapter-content",
    "div#content",
];

const ID_VARIABLE: &str = "rid";
const ID_INPUT: &str = "bid";
const CHAPTER_COUNT_LABEL: &str = "Số chương";

fn re_chapter_count() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"Số chương\s*:\s*(\d+)").unwrap())
}

/// Adapter for metruyenchu.com.vn
#[derive(Debug, Clone)]
pub struct MetruyenchuSource {
    client: HttpClient,
    normalizer: ContentNormalizer,
    chapters_per_page: u32,
}

/// Fields scraped from the landing page before the cover download
#[derive(Debug)]
struct Landing {
    title: String,
    author: String,
    description: Option<String>,
    cover_url: Option<String>,
    id: u64,
    total_chapters: u32,
}

impl MetruyenchuSource {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(&config.http)?,
            normalizer: ContentNormalizer::from_config(&config.crawl),
            chapters_per_page: config.crawl.chapters_per_page,
        })
    }
}

#[async_trait]
impl NovelSource for MetruyenchuSource {
    fn name(&self) -> &'static str {
        "metruyenchu.com.vn"
    }

    async fn parse_novel_url(&self, url: &str) -> Result<NovelMetadata> {
        let location = locate_novel(url)?;
        tracing::info!("Fetching novel page {}", url);

        let html = self.client.get_text(url).await?;
        let landing = scrape_landing(url, &html, &location)?;

        tracing::info!(
            "Found '{}' by {} (id {}, {} chapters)",
            landing.title,
            landing.author,
            landing.id,
            landing.total_chapters
        );

        let cover_image = download_cover(&self.client, landing.cover_url).await;

        Ok(NovelMetadata {
            source_base_url: location.base_url,
            slug: location.slug,
            id: landing.id,
            title: landing.title,
            author: landing.author,
            description: landing.description,
            cover_image,
            total_chapters: Some(landing.total_chapters),
            max_listing_pages: listing_page_cap(landing.total_chapters, self.chapters_per_page),
        })
    }

    async fn list_chapters(&self, metadata: &NovelMetadata, delay: Duration) -> Result<Vec<ChapterRef>> {
        let endpoint = JsonListingEndpoint::new(self.client.clone(), &metadata.source_base_url, metadata.id);
        let aggregator = ChapterListAggregator::new(&metadata.source_base_url, delay)?;
        let listing = aggregator.collect(&endpoint, metadata.max_listing_pages).await;

        tracing::debug!(
            "Listing stopped after {} pages ({:?})",
            listing.pages,
            listing.stop
        );

        Ok(listing.chapters)
    }

    async fn fetch_chapter_content(&self, url: &str) -> Result<FetchedChapter> {
        let html = self.client.get_text(url).await?;
        let fragment = extract_container(&html, CONTENT_SELECTORS, self.normalizer.ad_patterns())
            .ok_or_else(|| NovelError::ContentNotFound {
                url: url.to_string(),
            })?;

        Ok(FetchedChapter {
            title: None,
            content_html: self.normalizer.normalize(&fragment),
        })
    }
}

fn scrape_landing(url: &str, html: &str, location: &NovelLocation) -> Result<Landing> {
    let document = Html::parse_document(html);

    let title = title_or_slug(select_text(&document, TITLE_SELECTORS), &location.slug, url)?;
    let author = select_text(&document, AUTHOR_SELECTORS).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let description = select_first(&document, &["div[itemprop='description']"])
        .map(|el| collapse_text(el, "\n"))
        .filter(|text| !text.is_empty());
    let cover_url = select_attr(&document, &["img[itemprop='image']"], "src")
        .and_then(|src| resolve_url(&location.base_url, &src));

    let id = discover_novel_id(html, &document, ID_VARIABLE, ID_INPUT).ok_or_else(|| {
        NovelError::IdNotFound {
            url: url.to_string(),
        }
    })?;

    let total_chapters = labelled_chapter_count(&document)
        .or_else(|| scanned_chapter_count(html))
        .filter(|total| *total > 0)
        .ok_or_else(|| NovelError::ChapterCountNotFound {
            url: url.to_string(),
        })?;

    Ok(Landing {
        title,
        author,
        description,
        cover_url,
        id,
        total_chapters,
    })
}

/// Reads the number next to a `<b>Số chương</b>` label
fn labelled_chapter_count(document: &Html) -> Option<u32> {
    let selector = parse_selector("b")?;
    document
        .select(&selector)
        .filter(|b| collapse_text(*b, " ").contains(CHAPTER_COUNT_LABEL))
        .filter_map(|b| b.parent().and_then(ElementRef::wrap))
        .find_map(|parent| {
            let text = collapse_text(parent, " ");
            let after_label = text
                .split_once(CHAPTER_COUNT_LABEL)
                .map_or(text.as_str(), |(_, rest)| rest);
            first_number(after_label)
        })
}

/// Scans the raw page for `Số chương : N`
fn scanned_chapter_count(html: &str) -> Option<u32> {
    re_chapter_count().captures(html)?[1].parse().ok()
}
