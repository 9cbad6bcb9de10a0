//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and tempfile for the
//! mirror directory and run the full mirror cycle end-to-end.

use site_mirror::config::{load_config, Config};
use site_mirror::crawler::{
    build_http_client, mirror_seeds, mirror_site, DownloadContext, ExtensionHandlers,
    HtmlLinkExtractor, Registry, RetryPolicy, Semaphore,
};
use site_mirror::url::DomainScope;
use site_mirror::{AssetState, ConfigError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOOK_PAGE: &str = r##"<html>
<head>
  <link rel="stylesheet" href="css/book.css">
  <script src="/js/nav.js"></script>
</head>
<body>
  <img src="../img/cover.png">
  <a href="chapter2.html">Next chapter</a>
  <a href="#top">Top</a>
  <a href="mailto:author@example.com">Mail</a>
  OTHER_LINK
</body>
</html>"##;

/// Writes a config file plus a PAGES file into `dir` and loads it
fn write_config(dir: &Path, seeds: &[String], extra_crawler: &str, retry: &str) -> Config {
    let pages = dir.join("PAGES");
    std::fs::write(&pages, seeds.join("\n")).unwrap();

    let config_path = dir.join("mirror.toml");
    let content = format!(
        r#"
[crawler]
target-domain = "127.0.0.1"
{extra_crawler}

{retry}

[output]
mirror-dir = "{mirror}"

[input]
pages-file = "{pages}"
"#,
        extra_crawler = extra_crawler,
        retry = retry,
        mirror = dir.join("website").display(),
        pages = pages.display(),
    );
    std::fs::write(&config_path, content).unwrap();

    load_config(&config_path).unwrap()
}

/// Mounts the book page and its three sub-resources
async fn mount_book(server: &MockServer, other: &MockServer) {
    let other_link = format!(
        r#"<img src="http://localhost:{}/ad.png">"#,
        other.address().port()
    );

    Mock::given(method("GET"))
        .and(path("/book/chapter1.html"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(BOOK_PAGE.replace("OTHER_LINK", &other_link)),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/css/book.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body { margin: 0 }"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/js/nav.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("nav();"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/cover.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ad"))
        .expect(0)
        .mount(other)
        .await;
}

#[tokio::test]
async fn test_full_mirror_single_page() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    mount_book(&server, &other).await;

    Mock::given(method("GET"))
        .and(path("/book/chapter2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &[format!("{}/book/chapter1.html", server.uri())],
        "",
        "",
    );

    let stats = mirror_site(&config).await.unwrap();

    let mirror = dir.path().join("website");
    assert!(mirror.join("book/chapter1.html").is_file());
    assert_eq!(
        std::fs::read_to_string(mirror.join("book/css/book.css")).unwrap(),
        "body { margin: 0 }"
    );
    assert_eq!(
        std::fs::read_to_string(mirror.join("js/nav.js")).unwrap(),
        "nav();"
    );
    assert_eq!(
        std::fs::read(mirror.join("img/cover.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );
    assert!(!mirror.join("book/chapter2.html").exists());

    assert_eq!(stats.seeds, 1);
    assert_eq!(stats.discovered, 4);
    assert_eq!(stats.downloaded, 4);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.files_written, 4);
    assert_eq!(stats.count(AssetState::Downloaded), 4);
    assert!(stats.finished_at.is_some());
}

#[tokio::test]
async fn test_follow_html_links_enabled() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    mount_book(&server, &other).await;

    Mock::given(method("GET"))
        .and(path("/book/chapter2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a href="chapter1.html">Back</a><img src="/img/cover.png"></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &[format!("{}/book/chapter1.html", server.uri())],
        "follow-html-links = true",
        "",
    );

    let stats = mirror_site(&config).await.unwrap();

    assert!(dir.path().join("website/book/chapter2.html").is_file());
    // chapter1 and cover.png are referenced twice but downloaded once
    assert_eq!(stats.discovered, 5);
    assert_eq!(stats.downloaded, 5);
}

#[tokio::test]
async fn test_duplicate_seeds_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let home = format!("{}/", server.uri());
    let config = write_config(
        dir.path(),
        &[home.clone(), format!("{}#intro", home), String::new(), home],
        "",
        "",
    );

    let stats = mirror_site(&config).await.unwrap();

    assert!(dir.path().join("website/index.html").is_file());
    assert_eq!(stats.discovered, 1);
    assert_eq!(stats.seeds, 1);
}

#[tokio::test]
async fn test_timeout_does_not_stall_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<img src="slow.png"><img src="fast.png"><script src="app.js"></script>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast.png"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fast"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("app"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &[format!("{}/index.html", server.uri())],
        "download-timeout-ms = 300\nmax-concurrent-downloads = 1",
        "[retry]\nstrategy = \"manual\"",
    );

    let stats = tokio::time::timeout(Duration::from_secs(10), mirror_site(&config))
        .await
        .expect("crawl stalled on a slow asset")
        .unwrap();

    let mirror = dir.path().join("website");
    assert!(mirror.join("fast.png").is_file());
    assert!(mirror.join("app.js").is_file());
    assert!(!mirror.join("slow.png").exists());

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.downloaded, 3);
    assert_eq!(stats.failed_urls, vec![format!("{}/slow.png", server.uri())]);
}

#[tokio::test]
async fn test_bounded_retry_recovers_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky.css"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &[format!("{}/flaky.css", server.uri())],
        "",
        "[retry]\nmax-attempts = 3\nbase-delay-ms = 10\nmax-delay-ms = 20",
    );

    let stats = mirror_site(&config).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("website/flaky.css")).unwrap(),
        "recovered"
    );
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_missing_page_recorded_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.html"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &[format!("{}/gone.html", server.uri())],
        "",
        "",
    );

    let stats = mirror_site(&config).await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.files_written, 0);
    assert!(!dir.path().join("website/gone.html").exists());
}

#[tokio::test]
async fn test_clean_before_crawl_removes_stale_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let stale = dir.path().join("website/old/stale.html");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "stale").unwrap();

    let config = write_config(
        dir.path(),
        &[format!("{}/new.html", server.uri())],
        "",
        "",
    );
    assert!(config.output.clean_before_crawl);

    mirror_site(&config).await.unwrap();

    assert!(!stale.exists());
    assert!(dir.path().join("website/new.html").is_file());
}

#[tokio::test]
async fn test_manual_resubmit_through_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/later.js"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/later.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("later"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let context = Arc::new(DownloadContext::new(
        build_http_client().unwrap(),
        Arc::new(Semaphore::new(2)),
        Duration::from_secs(5),
    ));
    let registry = Registry::new(
        Arc::clone(&context),
        ExtensionHandlers::new(),
        dir.path(),
        RetryPolicy::manual(),
    );

    let target = Url::parse(&format!("{}/later.js", server.uri())).unwrap();
    registry.enqueue(target.clone());
    registry.wait_idle().await;
    assert_eq!(registry.failed_urls(), vec![target.to_string()]);

    for url in registry.failed_urls() {
        assert!(registry.resubmit(&url));
    }
    registry.wait_idle().await;

    assert!(registry.failed_urls().is_empty());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("later.js")).unwrap(),
        "later"
    );
    assert_eq!(context.semaphore().available_permits(), 2);
}

#[tokio::test]
async fn test_mirror_seeds_without_pages_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<script src="search.js"></script>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/search.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("search()"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &[], "", "");
    let seeds = vec![Url::parse(&format!("{}/docs/", server.uri())).unwrap()];

    let stats = mirror_seeds(&config, seeds).await.unwrap();

    let mirror = dir.path().join("website");
    assert!(mirror.join("docs/index.html").is_file());
    assert!(mirror.join("docs/search.js").is_file());
    assert_eq!(stats.downloaded, 2);
}

#[test]
fn test_duplicate_extension_handler_is_config_error() {
    let scope = DomainScope::new("127.0.0.1");
    let mut handlers = ExtensionHandlers::new();
    handlers
        .register("html", HtmlLinkExtractor::new(scope.clone()))
        .unwrap();

    let err = handlers
        .register("html", HtmlLinkExtractor::new(scope))
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateHandler(_)));
}
