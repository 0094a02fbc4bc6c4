//! Integration tests for the site adapters
//!
//! Each test serves a small fake site from a wiremock server and drives a
//! real adapter through metadata parsing, listing and content fetching.

use novelsmith::config::Config;
use novelsmith::crawler::run_crawl;
use novelsmith::output::{DocumentSink, EpubSink};
use novelsmith::{FetchStatus, NovelError, SourceKind};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

fn fast_config() -> Config {
    let mut config = Config::default();
    config.crawl.chapter_delay_ms = 0;
    config.crawl.listing_delay_ms = 0;
    config
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

fn metruyenchu_landing(heading: &str) -> String {
    format!(
        r#"<html><head><script>var rid = '60240';</script></head><body>
            {heading}
            <a itemprop="author" href="/tac-gia/nhi-can">Nhĩ Căn</a>
            <img itemprop="image" src="/covers/tien-nghich.jpg">
            <div itemprop="description">Một người tu tiên.</div>
            <ul><li><b>Số chương</b>: 3</li></ul>
        </body></html>"#
    )
}

fn metruyenchu_chapter(n: u32) -> String {
    format!(
        r#"<html><body>
            <div id="chapter-content">
                <script>track();</script>
                Dòng {n} một<br><br>Dòng {n} hai
                <div class="ads-inline">Quảng cáo</div>
            </div>
        </body></html>"#
    )
}

#[tokio::test]
async fn test_metruyenchu_end_to_end() {
    let server = MockServer::start().await;
    let config = fast_config();

    mount_html(
        &server,
        "/tien-nghich",
        &metruyenchu_landing(r#"<h1 itemprop="name">Tiên Nghịch</h1>"#),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/covers/tien-nghich.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fragment = (1..=3)
        .map(|n| format!(r#"<a href="/tien-nghich/chuong-{n}">Chương {n}</a>"#))
        .collect::<String>();
    Mock::given(method("GET"))
        .and(path("/get/listchap/60240"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": fragment })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get/listchap/60240"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "" })))
        .expect(0)
        .mount(&server)
        .await;

    for n in 1..=3 {
        mount_html(
            &server,
            &format!("/tien-nghich/chuong-{}", n),
            &metruyenchu_chapter(n),
        )
        .await;
    }

    let source = SourceKind::Metruyenchu.build(&config).unwrap();
    let url = format!("{}/tien-nghich", server.uri());
    let result = run_crawl(source.as_ref(), &url, None, None, &config, CancellationToken::new())
        .await
        .unwrap();

    let metadata = &result.metadata;
    assert_eq!(metadata.title, "Tiên Nghịch");
    assert_eq!(metadata.author, "Nhĩ Căn");
    assert_eq!(metadata.id, 60240);
    assert_eq!(metadata.total_chapters, Some(3));
    assert_eq!(metadata.max_listing_pages, Some(1));
    assert_eq!(metadata.cover_image, None);
    assert_eq!(metadata.source_base_url, server.uri());

    let records = &result.outcome.records;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.fetch_status == FetchStatus::Ok));
    assert_eq!(records[0].title(), "Chương 1");
    assert_eq!(
        records[1].content_html,
        "<div>\n<p>Dòng 2 một</p>\n<p>Dòng 2 hai</p>\n</div>"
    );

    let dir = tempfile::tempdir().unwrap();
    let written = EpubSink::new(dir.path(), "vi")
        .write(metadata, records)
        .unwrap();
    assert_eq!(written, dir.path().join("Tiên_Nghịch.epub"));
    assert!(written.exists());
}

#[tokio::test]
async fn test_metruyenchu_cover_and_slug_title() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/nuong-tu-dung-la-nu-ma-dau/",
        &metruyenchu_landing("<div class=\"heading\">no title element</div>"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/covers/tien-nghich.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_HEADER.to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let source = SourceKind::Metruyenchu.build(&fast_config()).unwrap();
    let metadata = source
        .parse_novel_url(&format!("{}/nuong-tu-dung-la-nu-ma-dau/", server.uri()))
        .await
        .unwrap();

    assert_eq!(metadata.title, "Nuong Tu Dung La Nu Ma Dau");
    assert_eq!(metadata.slug, "nuong-tu-dung-la-nu-ma-dau");
    assert_eq!(metadata.cover_image.as_deref(), Some(PNG_HEADER));
    assert_eq!(metadata.description.as_deref(), Some("Một người tu tiên."));
}

#[tokio::test]
async fn test_metruyenchu_missing_id_aborts_before_listing() {
    let server = MockServer::start().await;

    mount_html(&server, "/khong-id", "<h1>Không ID</h1><li><b>Số chương</b>: 9</li>").await;
    Mock::given(method("GET"))
        .and(path("/get/listchap/0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = fast_config();
    let source = SourceKind::Metruyenchu.build(&config).unwrap();
    let err = run_crawl(
        source.as_ref(),
        &format!("{}/khong-id", server.uri()),
        None,
        None,
        &config,
        CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, NovelError::IdNotFound { .. }));
    assert!(err.is_fatal_metadata());
}

#[tokio::test]
async fn test_metruyenchu_landing_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mat-tich"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = SourceKind::Metruyenchu.build(&fast_config()).unwrap();
    let err = source
        .parse_novel_url(&format!("{}/mat-tich", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, NovelError::Status { status: 404, .. }));
    assert!(err.is_network());
}

#[tokio::test]
async fn test_metruyenhot_synthesized_listing_and_retries() {
    let server = MockServer::start().await;
    let config = fast_config();

    mount_html(
        &server,
        "/truyen-thu",
        r#"<html><body>
            <script>var storyId = 777;</script>
            <div class="wrap-detail">
                <img data-src="/media/cover.jpg">
                <h1 class="title"><a href="/truyen-thu">Truyện Thử</a></h1>
                <span itemprop="author">Tác Giả</span>
            </div>
            <div class="row">
                <h3>Chương Mới Nhất</h3>
                <a href="/truyen-thu/chuong-3/">Chương 3</a>
            </div>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/media/cover.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/truyen-thu/chuong-1/",
        r#"<div class="rv-chapt-title"><h2><a>Chương 1: Mở đầu</a></h2></div>
           <div class="chapter-c"><p>Đoạn một</p><p>Đoạn hai</p></div>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/truyen-thu/chuong-2/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/truyen-thu/chuong-3/",
        r#"<div id="j_content">Chỉ một dòng</div>"#,
    )
    .await;

    let source = SourceKind::Metruyenhot.build(&config).unwrap();
    let url = format!("{}/truyen-thu", server.uri());
    let result = run_crawl(source.as_ref(), &url, None, None, &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.metadata.title, "Truyện Thử");
    assert_eq!(result.metadata.id, 777);
    assert_eq!(result.metadata.total_chapters, Some(3));
    assert_eq!(result.metadata.max_listing_pages, None);
    assert_eq!(result.metadata.cover_image, None);

    let records = &result.outcome.records;
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].title(), "Chương 1: Mở đầu");
    assert_eq!(
        records[0].content_html,
        "<div>\n<p>Đoạn một</p>\n<p>Đoạn hai</p>\n</div>"
    );

    assert_eq!(records[1].title(), "Chương 2");
    assert_eq!(records[1].fetch_status, FetchStatus::FailedExhausted);
    assert_eq!(records[1].attempts, 3);
    assert_eq!(
        records[1].chapter.url,
        format!("{}/truyen-thu/chuong-2/", server.uri())
    );

    assert!(records[2].is_ok());
    assert_eq!(records[2].content_html, "<div>\n<p>Chỉ một dòng</p>\n</div>");
}

#[tokio::test]
async fn test_metruyenhot_range_and_missing_content() {
    let server = MockServer::start().await;
    let config = fast_config();

    mount_html(
        &server,
        "/truyen-ngan",
        r#"<h1 class="title">Truyện Ngắn</h1>
           <a href="/truyen-ngan/chuong-1/">1</a><a href="/truyen-ngan/chuong-4/">4</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/truyen-ngan/chuong-1/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/truyen-ngan/chuong-2/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<div class=\"other\">không có nội dung</div>"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let source = SourceKind::Metruyenhot.build(&config).unwrap();
    let url = format!("{}/truyen-ngan", server.uri());
    let result = run_crawl(source.as_ref(), &url, Some(2), Some(2), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.metadata.total_chapters, Some(4));
    assert_eq!(result.outcome.records.len(), 1);
    let record = &result.outcome.records[0];
    assert_eq!(record.fetch_status, FetchStatus::FailedExhausted);
    assert!(record.content_html.contains("Chapter content not found"));
}
