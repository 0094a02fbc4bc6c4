//! metruyenhot.me adapter
//!
//! Chapters live at `{base}/{slug}/chuong-{n}/` with no gaps, so the list is
//! synthesized from the total count. The chapter page carries the real title.

use crate::config::Config;
use crate::html::extractor::{collapse_text, parse_selector, select_attr, select_first, select_text};
use crate::html::{extract_container, ContentNormalizer};
use crate::http::HttpClient;
use crate::model::{ChapterRef, FetchedChapter, NovelMetadata};
use crate::source::landing::{
    download_cover, locate_novel, resolve_url, slug_hash_id, title_or_slug, NovelLocation,
    UNKNOWN_AUTHOR,
};
use crate::source::NovelSource;
use crate::{NovelError, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use std::time::Duration;

const TITLE_SELECTORS: &[&str] = &[".wrap-detail h1.title a", "h1.title"];
const CONTENT_SELECTORS: &[&str] = &[".chapter-c", "#j_content"];
const CHAPTER_TITLE_SELECTORS: &[&str] = &[".rv-chapt-title h2 a"];

/// Characters kept from the fallback description block
const DESCRIPTION_LIMIT: usize = 500;

/// Chapters per pagination page on the landing page
const CHAPTERS_PER_LANDING_PAGE: u32 = 50;

fn re_story_id() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r#"storyId["\s:=]+["']?(\d+)"#).unwrap())
}

fn re_chapter_number() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"/chuong-(\d+)").unwrap())
}

fn re_page_number() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\?page=(\d+)").unwrap())
}

fn re_latest_heading() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?i)Chương Mới Nhất").unwrap())
}

/// Adapter for metruyenhot.me
#[derive(Debug, Clone)]
pub struct MetruyenhotSource {
    client: HttpClient,
    normalizer: ContentNormalizer,
}

#[derive(Debug)]
struct Landing {
    title: String,
    author: String,
    description: Option<String>,
    cover_url: Option<String>,
    id: u64,
    total_chapters: u32,
}

impl MetruyenhotSource {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(&config.http)?,
            normalizer: ContentNormalizer::from_config(&config.crawl),
        })
    }
}

#[async_trait]
impl NovelSource for MetruyenhotSource {
    fn name(&self) -> &'static str {
        "metruyenhot.me"
    }

    async fn parse_novel_url(&self, url: &str) -> Result<NovelMetadata> {
        let location = locate_novel(url)?;
        tracing::info!("Fetching novel page {}", url);

        let html = self.client.get_text(url).await?;
        let landing = scrape_landing(url, &html, &location)?;

        tracing::info!(
            "Found '{}' by {} ({} chapters)",
            landing.title,
            landing.author,
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
            max_listing_pages: None,
        })
    }

    async fn list_chapters(&self, metadata: &NovelMetadata, _delay: Duration) -> Result<Vec<ChapterRef>> {
        let total = metadata.total_chapters.unwrap_or(0);
        tracing::info!("Generating {} chapter URLs", total);
        Ok(synthesize_chapters(&metadata.source_base_url, &metadata.slug, total))
    }

    async fn fetch_chapter_content(&self, url: &str) -> Result<FetchedChapter> {
        let html = self.client.get_text(url).await?;
        scrape_chapter(url, &html, &self.normalizer)
    }
}

/// Builds `{base}/{slug}/chuong-{n}/` for `n` in `1..=total`
fn synthesize_chapters(base_url: &str, slug: &str, total: u32) -> Vec<ChapterRef> {
    let base_url = base_url.trim_end_matches('/');
    (1..=total)
        .map(|n| ChapterRef {
            title: format!("Chương {}", n),
            url: format!("{}/{}/chuong-{}/", base_url, slug, n),
            slug: format!("chuong-{}", n),
        })
        .collect()
}

fn scrape_chapter(url: &str, html: &str, normalizer: &ContentNormalizer) -> Result<FetchedChapter> {
    let title = {
        let document = Html::parse_document(html);
        select_text(&document, CHAPTER_TITLE_SELECTORS)
    };

    let fragment = extract_container(html, CONTENT_SELECTORS, normalizer.ad_patterns()).ok_or_else(|| {
        NovelError::ContentNotFound {
            url: url.to_string(),
        }
    })?;

    Ok(FetchedChapter {
        title,
        content_html: normalizer.normalize(&fragment),
    })
}

fn scrape_landing(url: &str, html: &str, location: &NovelLocation) -> Result<Landing> {
    let document = Html::parse_document(html);

    let title = title_or_slug(select_text(&document, TITLE_SELECTORS), &location.slug, url)?;
    let author =
        select_text(&document, &["span[itemprop='author']"]).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let description = select_text(&document, &["span[itemprop='description']"]).or_else(|| {
        select_first(&document, &[".content1"])
            .map(|el| collapse_text(el, "\n"))
            .filter(|text| !text.is_empty())
            .map(|text| text.chars().take(DESCRIPTION_LIMIT).collect())
    });
    let cover_url = select_attr(&document, &[".wrap-detail img[data-src]"], "data-src")
        .and_then(|src| resolve_url(&location.base_url, &src));

    let id = match story_id(html) {
        Some(id) => id,
        None => {
            let id = slug_hash_id(&location.slug);
            tracing::debug!("No storyId on page, using slug hash {}", id);
            id
        }
    };

    let total_chapters = latest_chapter_number(&document)
        .or_else(|| pagination_estimate(&document))
        .or_else(|| highest_chapter_link(html))
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

fn story_id(html: &str) -> Option<u64> {
    re_story_id().captures(html)?[1].parse().ok()
}

/// Chapter number of the first link in the "Chương Mới Nhất" section
fn latest_chapter_number(document: &Html) -> Option<u32> {
    let heading_selector = parse_selector("h3")?;
    let link_selector = parse_selector("a[href]")?;

    let heading = document
        .select(&heading_selector)
        .find(|h3| re_latest_heading().is_match(&collapse_text(*h3, " ")))?;
    let section = latest_section(heading)?;

    let number = section
        .select(&link_selector)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| re_chapter_number().captures(href)?[1].parse().ok());
    if let Some(n) = number {
        tracing::debug!("Latest chapter number {} from heading section", n);
    }
    number
}

/// Closest `div.row` ancestor of the heading, else its closest `div`
fn latest_section(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let divs: Vec<ElementRef<'_>> = heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "div")
        .collect();

    divs.iter()
        .find(|el| el.value().classes().any(|class| class == "row"))
        .or_else(|| divs.first())
        .copied()
}

/// Estimates the total from the highest pagination page
fn pagination_estimate(document: &Html) -> Option<u32> {
    let selector = parse_selector(".pagination a[href]")?;
    let last_page = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| re_page_number().captures(href)?[1].parse::<u32>().ok())
        .max()
        .filter(|page| *page > 1)?;

    tracing::debug!("Estimating chapter count from {} listing pages", last_page);
    last_page.checked_mul(CHAPTERS_PER_LANDING_PAGE)
}

/// Highest `/chuong-N` number anywhere in the raw page
fn highest_chapter_link(html: &str) -> Option<u32> {
    re_chapter_number()
        .captures_iter(html)
        .filter_map(|caps| caps[1].parse().ok())
        .max()
}
