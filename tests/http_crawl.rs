// End-to-end crawls through the real reqwest fetcher against wiremock servers.

use std::sync::Arc;
use std::time::Duration;

use link_sentry::{BrokenStatus, CrawlConfig, Crawler, MemoryReporter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_finds_missing_page() {
    let server = MockServer::start().await;
    mount_html(&server, "/", r#"<a href="/a">A</a> <a href="/missing">M</a>"#).await;
    mount_html(&server, "/a", "<p>nothing</p>").await;
    mount_status(&server, "/missing", 404).await;

    let reporter = Arc::new(MemoryReporter::new());
    let config = CrawlConfig::new(&format!("{}/", server.uri())).unwrap();
    let summary = Crawler::new(config, reporter.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let records = reporter.sorted();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("{}/missing", server.uri()));
    assert_eq!(records[0].status, BrokenStatus::NotFound);
    assert_eq!(records[0].referrer_page, format!("{}/", server.uri()));
    assert_eq!(records[0].referrer_href, "/missing");
    assert_eq!(records[0].referrer_text, "M");
    assert_eq!(summary.pages_fetched, 3);
}

#[tokio::test]
async fn test_each_page_requested_once() {
    let server = MockServer::start().await;

    for (route, body) in [
        ("/", r#"<a href="/a">a</a><a href="/b">b</a>"#),
        ("/a", r#"<a href="/b">b</a><a href="/">home</a>"#),
        ("/b", r#"<a href="/a#top">a</a><a href="/">home</a>"#),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let reporter = Arc::new(MemoryReporter::new());
    let config = CrawlConfig::new(&server.uri()).unwrap().with_workers(4);
    Crawler::new(config, reporter.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(reporter.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_slow_page_is_unreachable() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<a href="/slow">slow</a><a href="/server-error">boom</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    mount_status(&server, "/server-error", 500).await;

    let reporter = Arc::new(MemoryReporter::new());
    let config = CrawlConfig::new(&server.uri())
        .unwrap()
        .with_timeout(Duration::from_millis(300));
    Crawler::new(config, reporter.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let records = reporter.sorted();
    assert_eq!(records.len(), 2);

    let error = records
        .iter()
        .find(|r| r.referrer_href == "/server-error")
        .unwrap();
    assert_eq!(error.status, BrokenStatus::ServerError);

    let slow = records.iter().find(|r| r.referrer_href == "/slow").unwrap();
    assert!(slow.status.is_unreachable());
    assert_eq!(slow.referrer_text, "slow");
}

#[tokio::test]
async fn test_prefix_scope_over_http() {
    let server = MockServer::start().await;
    mount_html(&server, "/docs/a", r#"<a href="/other">other</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("content-type", "text/html")
                .set_body_string(r#"<a href="/other/child">child</a>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/other/child"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let reporter = Arc::new(MemoryReporter::new());
    let config = CrawlConfig::new(&format!("{}/docs/a", server.uri()))
        .unwrap()
        .with_prefixes(vec!["/docs".to_string()]);
    Crawler::new(config, reporter.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let records = reporter.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, BrokenStatus::ServerError);
    assert_eq!(records[0].url, format!("{}/other", server.uri()));
    server.verify().await;
}
