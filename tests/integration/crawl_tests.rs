//! Integration tests for the crawler
//!
//! These tests drive the listing aggregator against wiremock servers and
//! the orchestrator against an in-process fake source.

use async_trait::async_trait;
use novelsmith::config::Config;
use novelsmith::crawler::{
    run_crawl, ChapterListAggregator, CrawlOrchestrator, JsonListingEndpoint, ListingEndpoint, ListingStop,
};
use novelsmith::http::HttpClient;
use novelsmith::model::{ChapterRef, FetchStatus, FetchedChapter, NovelMetadata};
use novelsmith::{NovelError, NovelSource};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOVEL_ID: u64 = 42;

fn chapter(n: u32) -> ChapterRef {
    ChapterRef {
        title: format!("Chương {}", n),
        url: format!("https://example.com/truyen/chuong-{}", n),
        slug: format!("chuong-{}", n),
    }
}

/// Scriptable source: chapters listed up front, failures and titles per URL
#[derive(Default)]
struct FakeSource {
    chapters: Vec<ChapterRef>,
    failing: Vec<String>,
    titles: HashMap<String, String>,
    cancel_on: Option<(String, CancellationToken)>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl FakeSource {
    fn with_chapters(count: u32) -> Self {
        Self {
            chapters: (1..=count).map(chapter).collect(),
            ..Self::default()
        }
    }

    fn attempts(&self, url: &str) -> u32 {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn fetched_urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.attempts.lock().unwrap().keys().cloned().collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl NovelSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn parse_novel_url(&self, _url: &str) -> novelsmith::Result<NovelMetadata> {
        Ok(NovelMetadata {
            source_base_url: "https://example.com".to_string(),
            slug: "truyen".to_string(),
            id: NOVEL_ID,
            title: "Truyện".to_string(),
            author: "Tác giả".to_string(),
            description: None,
            cover_image: None,
            total_chapters: Some(self.chapters.len() as u32),
            max_listing_pages: None,
        })
    }

    async fn list_chapters(&self, _metadata: &NovelMetadata, _delay: Duration) -> novelsmith::Result<Vec<ChapterRef>> {
        Ok(self.chapters.clone())
    }

    async fn fetch_chapter_content(&self, url: &str) -> novelsmith::Result<FetchedChapter> {
        *self.attempts.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        if let Some((cancel_url, token)) = &self.cancel_on {
            if cancel_url == url {
                token.cancel();
                return Err(NovelError::ContentNotFound { url: url.to_string() });
            }
        }

        if self.failing.iter().any(|failing| failing == url) {
            return Err(NovelError::Status {
                url: url.to_string(),
                status: 503,
            });
        }

        Ok(FetchedChapter {
            title: self.titles.get(url).cloned(),
            content_html: format!("<div>\n<p>{}</p>\n</div>", url),
        })
    }
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.crawl.chapter_delay_ms = 0;
    config.crawl.listing_delay_ms = 0;
    config
}

fn listing_fragment(numbers: std::ops::RangeInclusive<u32>) -> String {
    numbers
        .map(|n| format!(r#"<li><a href="/truyen/chuong-{n}">Chương {n}</a></li>"#))
        .collect()
}

async fn mount_listing_page(server: &MockServer, page: u32, body: serde_json::Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/get/listchap/{}", NOVEL_ID)))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

fn endpoint(server: &MockServer) -> JsonListingEndpoint {
    let client = HttpClient::new(&Config::default().http).unwrap();
    JsonListingEndpoint::new(client, &server.uri(), NOVEL_ID)
}

#[tokio::test]
async fn test_always_failing_chapter_gets_exactly_max_attempts() {
    let mut source = FakeSource::with_chapters(3);
    source.failing = vec![chapter(2).url];

    let orchestrator = CrawlOrchestrator::new(Duration::ZERO, 3);
    let outcome = orchestrator.crawl(&source, source.chapters.clone()).await;

    assert!(!outcome.interrupted);
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(source.attempts(&chapter(2).url), 3);
    assert_eq!(source.attempts(&chapter(3).url), 1);

    let failed = &outcome.records[1];
    assert_eq!(failed.fetch_status, FetchStatus::FailedExhausted);
    assert_eq!(failed.attempts, 3);
    assert!(failed.content_html.contains("after 3 attempts"));
    assert!(failed.content_html.contains("HTTP status 503"));

    assert!(outcome.records[2].is_ok());
    assert_eq!(outcome.succeeded(), 2);
}

#[tokio::test]
async fn test_records_keep_input_order_and_site_titles() {
    let mut source = FakeSource::with_chapters(4);
    source
        .titles
        .insert(chapter(3).url, "Chương 3: Tên thật".to_string());
    source.titles.insert(chapter(4).url, "   ".to_string());

    let orchestrator = CrawlOrchestrator::new(Duration::ZERO, 3);
    let outcome = orchestrator.crawl(&source, source.chapters.clone()).await;

    let titles: Vec<_> = outcome.records.iter().map(|r| r.title().to_string()).collect();
    assert_eq!(titles, vec!["Chương 1", "Chương 2", "Chương 3: Tên thật", "Chương 4"]);
    assert!(outcome.records.iter().all(|r| r.attempts == 1));
}

#[tokio::test]
async fn test_cancellation_keeps_fetched_records() {
    let token = CancellationToken::new();
    let mut source = FakeSource::with_chapters(5);
    source.cancel_on = Some((chapter(3).url, token.clone()));

    let orchestrator = CrawlOrchestrator::new(Duration::ZERO, 3).with_cancellation(token);
    let outcome = orchestrator.crawl(&source, source.chapters.clone()).await;

    assert!(outcome.interrupted);
    assert_eq!(outcome.records.len(), 2);
    assert!(outcome.records.iter().all(|r| r.is_ok()));
    assert_eq!(source.attempts(&chapter(3).url), 1);
    assert_eq!(source.attempts(&chapter(4).url), 0);
}

#[tokio::test]
async fn test_run_crawl_applies_range() {
    let source = FakeSource::with_chapters(6);

    let result = run_crawl(
        &source,
        "https://example.com/truyen",
        Some(2),
        Some(4),
        &fast_config(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let slugs: Vec<_> = result.outcome.records.iter().map(|r| r.chapter.slug.clone()).collect();
    assert_eq!(slugs, vec!["chuong-2", "chuong-3", "chuong-4"]);
    assert_eq!(
        source.fetched_urls(),
        vec![chapter(2).url, chapter(3).url, chapter(4).url]
    );
    assert_eq!(result.metadata.id, NOVEL_ID);
}

#[tokio::test]
async fn test_run_crawl_rejects_bad_range_and_empty_list() {
    let source = FakeSource::with_chapters(3);
    let err = run_crawl(
        &source,
        "https://example.com/truyen",
        Some(2),
        Some(5),
        &fast_config(),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, NovelError::InvalidRange { start: 2, end: 5, total: 3 }));
    assert!(source.fetched_urls().is_empty());

    let empty = FakeSource::default();
    let err = run_crawl(
        &empty,
        "https://example.com/truyen",
        None,
        None,
        &fast_config(),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, NovelError::NoChapters { .. }));
}

#[tokio::test]
async fn test_run_crawl_cancelled_before_discovery() {
    let source = FakeSource::with_chapters(3);
    let token = CancellationToken::new();
    token.cancel();

    let err = run_crawl(
        &source,
        "https://example.com/truyen",
        None,
        None,
        &fast_config(),
        token,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, NovelError::Interrupted));
    assert!(source.fetched_urls().is_empty());
}

#[tokio::test]
async fn test_listing_stops_at_first_empty_page() {
    let server = MockServer::start().await;

    mount_listing_page(&server, 1, json!({ "data": listing_fragment(1..=3) }), 1).await;
    mount_listing_page(&server, 2, json!({ "data": listing_fragment(4..=6) }), 1).await;
    mount_listing_page(&server, 3, json!({ "data": listing_fragment(7..=8) }), 1).await;
    mount_listing_page(&server, 4, json!({ "data": "" }), 1).await;
    mount_listing_page(&server, 5, json!({ "data": listing_fragment(9..=9) }), 0).await;

    let aggregator = ChapterListAggregator::new(&server.uri(), Duration::ZERO).unwrap();
    let listing = aggregator.collect(&endpoint(&server), Some(10)).await;

    assert_eq!(listing.stop, ListingStop::NoData);
    assert_eq!(listing.pages, 3);
    let slugs: Vec<_> = listing.chapters.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec![
            "chuong-1", "chuong-2", "chuong-3", "chuong-4", "chuong-5", "chuong-6", "chuong-7",
            "chuong-8"
        ]
    );
    assert_eq!(listing.chapters[0].url, format!("{}/truyen/chuong-1", server.uri()));
}

#[tokio::test]
async fn test_listing_respects_page_cap() {
    let server = MockServer::start().await;

    for page in 1..=5u32 {
        let first = page * 10;
        let expected = if page <= 2 { 1 } else { 0 };
        mount_listing_page(&server, page, json!({ "data": listing_fragment(first..=first + 1) }), expected).await;
    }

    let aggregator = ChapterListAggregator::new(&server.uri(), Duration::ZERO).unwrap();
    let listing = aggregator.collect(&endpoint(&server), Some(2)).await;

    assert_eq!(listing.stop, ListingStop::PageCap);
    assert_eq!(listing.pages, 2);
    assert_eq!(listing.chapters.len(), 4);
}

#[tokio::test]
async fn test_listing_error_keeps_earlier_pages() {
    let server = MockServer::start().await;

    mount_listing_page(&server, 1, json!({ "data": listing_fragment(1..=2) }), 1).await;
    Mock::given(method("GET"))
        .and(path(format!("/get/listchap/{}", NOVEL_ID)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing_page(&server, 3, json!({ "data": listing_fragment(3..=4) }), 0).await;

    let aggregator = ChapterListAggregator::new(&server.uri(), Duration::ZERO).unwrap();
    let listing = aggregator.collect(&endpoint(&server), None).await;

    assert!(matches!(listing.stop, ListingStop::Error(ref message) if message.contains("500")));
    assert_eq!(listing.chapters.len(), 2);
}

#[tokio::test]
async fn test_listing_deduplicates_and_stops_without_links() {
    let server = MockServer::start().await;

    mount_listing_page(&server, 1, json!({ "data": listing_fragment(1..=3) }), 1).await;
    mount_listing_page(&server, 2, json!({ "data": listing_fragment(3..=4) }), 1).await;
    mount_listing_page(
        &server,
        3,
        json!({ "data": r#"<a href="/tac-gia/x">Tác giả</a><a href="javascript:void(0)">/chuong-9</a>"# }),
        1,
    )
    .await;

    let aggregator = ChapterListAggregator::new(&server.uri(), Duration::ZERO).unwrap();
    let listing = aggregator.collect(&endpoint(&server), None).await;

    assert_eq!(listing.stop, ListingStop::NoLinks);
    let slugs: Vec<_> = listing.chapters.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, vec!["chuong-1", "chuong-2", "chuong-3", "chuong-4"]);
}

/// In-process listing pages; records when each page was requested
struct ScriptedListing {
    pages: Vec<Option<String>>,
    requested: Mutex<Vec<(u32, Instant)>>,
}

impl ScriptedListing {
    fn new(pages: Vec<Option<String>>) -> Self {
        Self {
            pages,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().iter().map(|(page, _)| *page).collect()
    }

    fn requested_at(&self, page: u32) -> Instant {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| *p == page)
            .map(|(_, at)| *at)
            .unwrap()
    }
}

#[async_trait]
impl ListingEndpoint for ScriptedListing {
    async fn fetch_page(&self, page: u32) -> novelsmith::Result<Option<String>> {
        self.requested.lock().unwrap().push((page, Instant::now()));
        Ok(self.pages.get(page as usize - 1).cloned().flatten())
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_attempts_back_off_twice_the_chapter_delay() {
    let mut source = FakeSource::with_chapters(1);
    source.failing = vec![chapter(1).url];

    let orchestrator = CrawlOrchestrator::new(Duration::from_millis(100), 3);
    let started = Instant::now();
    let outcome = orchestrator.crawl(&source, source.chapters.clone()).await;

    // Two waits of 200ms between three attempts, none after the last
    assert_eq!(started.elapsed(), Duration::from_millis(400));
    assert_eq!(source.attempts(&chapter(1).url), 3);
    assert_eq!(outcome.records[0].fetch_status, FetchStatus::FailedExhausted);
}

#[tokio::test(start_paused = true)]
async fn test_chapter_delay_follows_each_success() {
    let mut source = FakeSource::with_chapters(3);
    source.failing = vec![chapter(2).url];

    let orchestrator = CrawlOrchestrator::new(Duration::from_millis(100), 2);
    let started = Instant::now();
    let outcome = orchestrator.crawl(&source, source.chapters.clone()).await;

    // 100ms after chapter 1, one 200ms backoff on chapter 2, 100ms after chapter 3
    assert_eq!(started.elapsed(), Duration::from_millis(400));
    assert_eq!(outcome.succeeded(), 2);
    assert_eq!(outcome.records[1].attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_promptly() {
    let token = CancellationToken::new();
    let mut source = FakeSource::with_chapters(2);
    source.failing = vec![chapter(2).url];

    let orchestrator =
        CrawlOrchestrator::new(Duration::from_secs(10), 3).with_cancellation(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        token.cancel();
    });

    let started = Instant::now();
    let outcome = orchestrator.crawl(&source, source.chapters.clone()).await;
    canceller.await.unwrap();

    // 10s after chapter 1, then cancelled 2s into the first 20s backoff
    assert_eq!(started.elapsed(), Duration::from_secs(12));
    assert!(outcome.interrupted);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(source.attempts(&chapter(2).url), 1);
}

#[tokio::test(start_paused = true)]
async fn test_listing_delay_between_pages() {
    let listing = ScriptedListing::new(vec![
        Some(listing_fragment(1..=2)),
        Some(listing_fragment(3..=4)),
        Some(listing_fragment(5..=5)),
        None,
    ]);
    let aggregator =
        ChapterListAggregator::new("https://example.com", Duration::from_millis(250)).unwrap();

    let started = Instant::now();
    let result = aggregator.collect(&listing, None).await;

    assert_eq!(result.stop, ListingStop::NoData);
    assert_eq!(result.chapters.len(), 5);
    assert_eq!(listing.requested_pages(), vec![1, 2, 3, 4]);
    assert_eq!(listing.requested_at(1) - started, Duration::ZERO);
    assert_eq!(listing.requested_at(2) - started, Duration::from_millis(250));
    assert_eq!(listing.requested_at(4) - started, Duration::from_millis(750));
    assert_eq!(started.elapsed(), Duration::from_millis(750));
}

#[tokio::test(start_paused = true)]
async fn test_no_listing_delay_after_page_cap() {
    let pages = (1..=5u32)
        .map(|page| Some(listing_fragment(page * 10..=page * 10 + 1)))
        .collect();
    let listing = ScriptedListing::new(pages);
    let aggregator =
        ChapterListAggregator::new("https://example.com", Duration::from_millis(250)).unwrap();

    let started = Instant::now();
    let result = aggregator.collect(&listing, Some(2)).await;

    assert_eq!(result.stop, ListingStop::PageCap);
    assert_eq!(listing.requested_pages(), vec![1, 2]);
    assert_eq!(started.elapsed(), Duration::from_millis(250));
}
