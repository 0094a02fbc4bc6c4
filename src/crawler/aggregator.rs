//! Chapter list aggregator
//!
//! Drives a paginated listing endpoint page by page (`page = 1, 2, 3, ...`)
//! and collects chapter links from each page's HTML payload.
//!
//! # Termination
//!
//! | Condition | Result |
//! |-----------|--------|
//! | Page cap reached | stop, keep everything |
//! | Page returns no data payload | stop, keep everything |
//! | Page yields zero chapter links | stop, keep everything |
//! | Request or parse error | stop at that page, keep earlier pages |

use crate::html::extractor::{collapse_text, parse_selector};
use crate::html::unescape_fragment;
use crate::http::HttpClient;
use crate::model::ChapterRef;
use crate::Result;
use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Substring a listing anchor must contain to count as a chapter link
pub const CHAPTER_MARKER: &str = "/chuong-";

/// A paginated source of chapter-list HTML fragments
#[async_trait]
pub trait ListingEndpoint: Send + Sync {
    /// Fetches one page (1-based); `Ok(None)` means the page has no data
    async fn fetch_page(&self, page: u32) -> Result<Option<String>>;
}

/// Listing endpoint returning `{ "data": "<html fragment>" }` JSON
#[derive(Debug, Clone)]
pub struct JsonListingEndpoint {
    client: HttpClient,
    base_url: String,
    novel_id: u64,
}

impl JsonListingEndpoint {
    pub fn new(client: HttpClient, base_url: &str, novel_id: u64) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            novel_id,
        }
    }

    /// `{base}/get/listchap/{id}?page={n}`
    pub fn page_url(&self, page: u32) -> String {
        format!("{}/get/listchap/{}?page={}", self.base_url, self.novel_id, page)
    }
}

#[async_trait]
impl ListingEndpoint for JsonListingEndpoint {
    async fn fetch_page(&self, page: u32) -> Result<Option<String>> {
        let url = self.page_url(page);
        let body: Value = self.client.get_json(&url).await?;
        listing_payload(&url, &body)
    }
}

/// Pulls the HTML fragment out of a listing response
fn listing_payload(url: &str, body: &Value) -> Result<Option<String>> {
    match body.get("data") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(data)) if data.trim().is_empty() => Ok(None),
        Some(Value::String(data)) => Ok(Some(data.clone())),
        Some(other) => Err(crate::NovelError::parse(
            url,
            format!("expected string 'data', got {}", other),
        )),
    }
}

/// Why pagination stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingStop {
    PageCap,
    NoData,
    NoLinks,
    /// Request or parse failure; carries the original error message
    Error(String),
}

/// Result of one aggregation pass
#[derive(Debug, Clone)]
pub struct ChapterListing {
    /// Deduplicated chapters in page order, then in-page order
    pub chapters: Vec<ChapterRef>,

    /// Number of pages that contributed links
    pub pages: u32,

    pub stop: ListingStop,
}

/// Collects chapter refs across listing pages
#[derive(Debug, Clone)]
pub struct ChapterListAggregator {
    base_url: Url,
    delay: Duration,
}

impl ChapterListAggregator {
    /// Creates an aggregator resolving links against `base_url`
    pub fn new(base_url: &str, delay: Duration) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            delay,
        })
    }

    /// Walks the endpoint until a termination condition is hit
    ///
    /// Never fails: a page error ends the pass and the chapters gathered so
    /// far are returned with [`ListingStop::Error`].
    pub async fn collect<E>(&self, endpoint: &E, max_pages: Option<u32>) -> ChapterListing
    where
        E: ListingEndpoint + ?Sized,
    {
        let mut chapters = Vec::new();
        let mut seen = HashSet::new();
        let mut page: u32 = 1;

        match max_pages {
            Some(cap) => tracing::info!("Fetching chapter list (up to {} pages)", cap),
            None => tracing::info!("Fetching chapter list"),
        }

        let stop = loop {
            if max_pages.is_some_and(|cap| page > cap) {
                tracing::info!("Reached listing page cap of {}", page - 1);
                break ListingStop::PageCap;
            }

            let fragment = match endpoint.fetch_page(page).await {
                Ok(Some(fragment)) => fragment,
                Ok(None) => {
                    tracing::info!("Listing page {} has no data, end of list", page);
                    break ListingStop::NoData;
                }
                Err(e) => {
                    tracing::warn!(
                        "Listing page {} failed, keeping {} chapters: {}",
                        page,
                        chapters.len(),
                        e
                    );
                    break ListingStop::Error(e.to_string());
                }
            };

            let page_chapters = extract_chapter_links(&fragment, &self.base_url, CHAPTER_MARKER);
            if page_chapters.is_empty() {
                tracing::info!("Listing page {} has no chapter links, end of list", page);
                break ListingStop::NoLinks;
            }

            tracing::info!("Listing page {}: {} chapters", page, page_chapters.len());
            for chapter in page_chapters {
                if seen.insert(chapter.url.clone()) {
                    chapters.push(chapter);
                } else {
                    tracing::debug!("Skipping duplicate chapter link {}", chapter.url);
                }
            }

            page += 1;

            if max_pages.map_or(true, |cap| page <= cap) {
                tokio::time::sleep(self.delay).await;
            }
        };

        tracing::info!("Found {} chapters in total", chapters.len());

        ChapterListing {
            chapters,
            pages: page - 1,
            stop,
        }
    }
}

/// Extracts chapter refs from one listing fragment, in document order
///
/// An anchor counts when its href contains `marker` (case-insensitive) and
/// is not a `javascript:` link. Relative hrefs are resolved against
/// `base_url`.
pub fn extract_chapter_links(fragment: &str, base_url: &Url, marker: &str) -> Vec<ChapterRef> {
    let fragment = unescape_fragment(fragment);
    let document = Html::parse_fragment(&fragment);
    let Some(selector) = parse_selector("a[href]") else {
        return Vec::new();
    };
    let marker = marker.to_lowercase();

    document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            if href.is_empty() || href.to_lowercase().contains("javascript:") {
                return None;
            }
            if !href.to_lowercase().contains(&marker) {
                return None;
            }

            let url = base_url.join(href).ok()?;
            Some(ChapterRef {
                title: collapse_text(anchor, " "),
                slug: last_path_segment(&url),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Last non-empty segment of a URL path
pub fn last_path_segment(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default()
        .to_string()
}
