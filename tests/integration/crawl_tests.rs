//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use gleaner::config::{Config, ExportFormat};
use gleaner::crawler::{
    scrape_url, scrape_urls, Controller, Decision, FixedOperator, Operator, ScrapeOptions,
    ScriptedOperator, Session, SkipReason, Step,
};
use gleaner::output::{
    read_crawled_urls, search_results, OutputError, OutputFormat, RawHtmlConverter,
};
use gleaner::storage::{CheckpointStore, SqliteCheckpointStore};
use gleaner::{CrawlError, CrawlPhase, FetchError};
use std::path::Path;
use std::sync::Arc;
use reqwest::Method;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no delays and all output under `dir`
fn create_test_config(dir: &Path, respect_robots: bool) -> Config {
    let mut config = Config::default();
    config.crawler.respect_robots_txt = respect_robots;
    config.crawler.crawl_delay = 0.0;
    config.crawler.error_cooldown = 0.0;
    config.session.backoff_factor = 0.0;
    config.session.rotate_user_agents = false;
    config.session.timeout = 5.0;

    let under = |name: &str| dir.join(name).to_string_lossy().to_string();
    config.output.crawled_dir = under("Crawled");
    config.output.exports_dir = under("Exports");
    config.output.results_dir = under("Results");
    config.output.checkpoint_database = under("crawl_state.db");
    config
}

fn html_page(links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">link</a>\n", href))
        .collect();
    format!("<html><body>\n{}</body></html>", anchors)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, links: &[String]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(html_page(links)))
        .mount(server)
        .await;
}

fn memory_store() -> Box<dyn CheckpointStore + Send> {
    Box::new(SqliteCheckpointStore::new_in_memory().expect("in-memory store"))
}

fn operator(decision: Decision) -> Box<dyn Operator + Send> {
    Box::new(FixedOperator::new(decision))
}

async fn start(
    seed: &str,
    config: Config,
    store: Box<dyn CheckpointStore + Send>,
    operator: Box<dyn Operator + Send>,
) -> Controller {
    Controller::start(seed, Arc::new(config), store, operator)
        .await
        .expect("Failed to start crawl")
}

#[tokio::test]
async fn test_first_step_enqueues_only_same_domain_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        &[
            format!("{}/a", base),
            "/b".to_string(),
            "https://other.example/c".to_string(),
        ],
    )
    .await;

    let config = create_test_config(dir.path(), false);
    let mut controller = start(
        &format!("{}/", base),
        config,
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    let step = controller.step().await.unwrap();
    assert!(matches!(
        step,
        Step::Visited {
            links_enqueued: 2,
            ..
        }
    ));

    let state = controller.state();
    assert_eq!(state.page_count, 1);
    assert_eq!(state.discovered(), &[format!("{}/", base)]);
    let pending: Vec<&str> = state.frontier.pending().collect();
    assert_eq!(pending, vec![format!("{}/a", base), format!("{}/b", base)]);
}

#[tokio::test]
async fn test_full_crawl_is_breadth_first() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/a".to_string(), "/b".to_string()]).await;
    mount_page(&server, "/a", &["/a1".to_string(), "/".to_string()]).await;
    mount_page(&server, "/b", &["/b1".to_string(), "/a".to_string()]).await;
    mount_page(&server, "/a1", &[]).await;
    mount_page(&server, "/b1", &[]).await;

    let config = create_test_config(dir.path(), false);
    let mut controller = start(
        &format!("{}/", base),
        config,
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    let report = controller.run().await.unwrap();

    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(report.state.page_count, 5);
    let expected: Vec<String> = ["/", "/a", "/b", "/a1", "/b1"]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();
    assert_eq!(report.state.discovered(), expected.as_slice());

    // Each page fetched once despite repeated links
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);

    let crawled = report.crawled_file.expect("crawled list written");
    assert_eq!(read_crawled_urls(&crawled).unwrap(), expected);
    assert_eq!(report.exports.len(), 3);
    assert!(report.checkpoint.is_none());
}

#[tokio::test]
async fn test_session_retries_transient_status() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html(html_page(&[])))
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), false);
    let session = Session::from_config(&config.session).unwrap();
    let url = url::Url::parse(&format!("{}/flaky", server.uri())).unwrap();

    let page = session.get(&url, Duration::from_secs(5)).await.unwrap();
    assert_eq!(page.status, 200);
    assert!(page.is_html());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_session_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut config = create_test_config(dir.path(), false);
    config.session.max_retries = 2;
    let session = Session::from_config(&config.session).unwrap();
    let url = url::Url::parse(&format!("{}/down", server.uri())).unwrap();

    let err = session.get(&url, Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_session_does_not_retry_not_found() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(dir.path(), false);
    let session = Session::from_config(&config.session).unwrap();
    let url = url::Url::parse(&format!("{}/gone", server.uri())).unwrap();

    let err = session.get(&url, Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_never_retries_post() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), false);
    let session = Session::from_config(&config.session).unwrap();
    let url = url::Url::parse(&format!("{}/submit", server.uri())).unwrap();

    let err = session
        .send(Method::POST, &url, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// Returns a local URL whose port has nothing listening on it
fn refused_url() -> url::Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    url::Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap()
}

#[tokio::test]
async fn test_session_retries_connection_failures() {
    let dir = TempDir::new().unwrap();
    let url = refused_url();

    let mut config = create_test_config(dir.path(), false);
    config.session.max_retries = 2;
    config.session.backoff_factor = 0.1;
    let session = Session::from_config(&config.session).unwrap();

    // Two retries sleep 100ms then 200ms before the final attempt
    let started = Instant::now();
    let err = session.get(&url, Duration::from_secs(5)).await.unwrap_err();
    let elapsed = started.elapsed();

    match err {
        FetchError::Request { source, .. } => assert!(source.is_connect()),
        other => panic!("expected a connection error, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_session_connection_failure_without_retries_is_immediate() {
    let dir = TempDir::new().unwrap();
    let url = refused_url();

    let mut config = create_test_config(dir.path(), false);
    config.session.max_retries = 0;
    config.session.backoff_factor = 5.0;
    let session = Session::from_config(&config.session).unwrap();

    let started = Instant::now();
    let err = session.get(&url, Duration::from_secs(5)).await.unwrap_err();

    assert!(matches!(err, FetchError::Request { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_robots_disallowed_paths_are_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        &["/private/page".to_string(), "/public".to_string()],
    )
    .await;
    mount_page(&server, "/public", &[]).await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html(html_page(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), true);
    let mut controller = start(
        &format!("{}/", base),
        config,
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    let report = controller.run().await.unwrap();
    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(
        report.state.discovered(),
        &[format!("{}/", base), format!("{}/public", base)]
    );
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/next".to_string()]).await;
    mount_page(&server, "/next", &[]).await;

    let config = create_test_config(dir.path(), true);
    let mut controller = start(
        &format!("{}/", base),
        config,
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    let report = controller.run().await.unwrap();
    assert_eq!(report.state.page_count, 2);
}

#[tokio::test]
async fn test_denied_seed_without_override_is_refused() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), true);
    let result = Controller::start(
        &format!("{}/", server.uri()),
        Arc::new(config),
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    assert!(matches!(result, Err(CrawlError::RobotsDenied { .. })));
}

#[tokio::test]
async fn test_denied_seed_with_override_visits_only_seed() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;
    mount_page(&server, "/", &["/other".to_string()]).await;

    let config = create_test_config(dir.path(), true);
    let operator = Box::new(FixedOperator::new(Decision::Continue).with_robots_override(true));
    let mut controller = start(&format!("{}/", base), config, memory_store(), operator).await;

    let report = controller.run().await.unwrap();
    assert_eq!(report.state.discovered(), &[format!("{}/", base)]);
}

#[tokio::test]
async fn test_non_html_and_failed_pages_are_not_counted() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        &[
            "/data.json".to_string(),
            "/missing".to_string(),
            "/after".to_string(),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;
    mount_page(&server, "/after", &[]).await;

    let config = create_test_config(dir.path(), false);
    let mut controller = start(
        &format!("{}/", base),
        config,
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    assert!(matches!(
        controller.step().await.unwrap(),
        Step::Visited { .. }
    ));
    match controller.step().await.unwrap() {
        Step::Skipped {
            reason: SkipReason::NotHtml { content_type },
            ..
        } => assert_eq!(content_type.as_deref(), Some("application/json")),
        other => panic!("expected non-HTML skip, got {:?}", other),
    }
    assert!(matches!(
        controller.step().await.unwrap(),
        Step::FetchFailed { .. }
    ));

    let report = controller.run().await.unwrap();
    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(
        report.state.discovered(),
        &[format!("{}/", base), format!("{}/after", base)]
    );
    assert!(!report
        .state
        .frontier
        .is_visited(&format!("{}/data.json", base)));
}

#[tokio::test]
async fn test_blacklisted_links_are_not_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        &["/admin/panel".to_string(), "/docs".to_string()],
    )
    .await;
    mount_page(&server, "/docs", &[]).await;
    Mock::given(method("GET"))
        .and(path("/admin/panel"))
        .respond_with(html(html_page(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(dir.path(), false);
    config.filter.blacklist = vec!["/admin".to_string()];
    let mut controller = start(
        &format!("{}/", base),
        config,
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    let report = controller.run().await.unwrap();
    assert_eq!(report.state.page_count, 2);
}

/// Mounts a seed page linking to `count` leaf pages under /p/
async fn mount_wide_site(server: &MockServer, count: usize) {
    let links: Vec<String> = (1..=count).map(|i| format!("/p/{}", i)).collect();
    mount_page(server, "/", &links).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/p/\d+$"))
        .respond_with(html(html_page(&[])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pause_checkpoints_and_resume_finishes() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    mount_wide_site(&server, 25).await;

    let config = create_test_config(dir.path(), false);
    let db_path = config.output.checkpoint_database.clone();

    let store = SqliteCheckpointStore::new(Path::new(&db_path)).unwrap();
    let mut controller = start(
        &format!("{}/", base),
        config.clone(),
        Box::new(store),
        operator(Decision::Pause),
    )
    .await;

    let paused = controller.run().await.unwrap();
    assert_eq!(paused.phase, CrawlPhase::Paused);
    assert_eq!(paused.state.page_count, 20);
    assert_eq!(paused.state.frontier.len(), 6);
    assert!(paused.crawled_file.is_none());
    let handle = paused.checkpoint.expect("checkpoint written");

    // A new store on the same file sees the checkpoint
    let store = SqliteCheckpointStore::new(Path::new(&db_path)).unwrap();
    let summaries = store.list().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].handle, handle);
    assert_eq!(summaries[0].page_count, 20);

    let restored = store.load(&handle).unwrap();
    assert_eq!(restored.page_count, 20);
    assert_eq!(restored.frontier, paused.state.frontier);

    let mut resumed = Controller::resume(
        restored,
        Arc::new(config),
        Box::new(store),
        operator(Decision::Continue),
    )
    .unwrap();
    let finished = resumed.run().await.unwrap();

    assert_eq!(finished.phase, CrawlPhase::Completed);
    assert_eq!(finished.state.page_count, 26);
    assert_eq!(finished.state.discovered().len(), 26);
    assert_eq!(server.received_requests().await.unwrap().len(), 26);
}

#[tokio::test]
async fn test_pause_without_state_saving_writes_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_wide_site(&server, 20).await;

    let mut config = create_test_config(dir.path(), false);
    config.crawler.save_crawl_state = false;
    let mut controller = start(
        &format!("{}/", server.uri()),
        config,
        memory_store(),
        operator(Decision::Pause),
    )
    .await;

    let report = controller.run().await.unwrap();
    assert_eq!(report.phase, CrawlPhase::Paused);
    assert!(report.checkpoint.is_none());
}

#[tokio::test]
async fn test_continue_at_limit_raises_max_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_wide_site(&server, 4).await;

    let mut config = create_test_config(dir.path(), false);
    config.crawler.max_pages = 3;
    let mut controller = start(
        &format!("{}/", server.uri()),
        config,
        memory_store(),
        operator(Decision::Continue),
    )
    .await;

    let report = controller.run().await.unwrap();
    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(report.state.page_count, 5);
    assert_eq!(report.state.max_pages, 103);
}

#[tokio::test]
async fn test_stop_at_limit_finalizes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_wide_site(&server, 10).await;

    let mut config = create_test_config(dir.path(), false);
    config.crawler.max_pages = 2;
    config.output.export_formats = vec![ExportFormat::Json];
    let script = ScriptedOperator::new([Decision::Stop], Decision::Continue);
    let mut controller = start(
        &format!("{}/", server.uri()),
        config,
        memory_store(),
        Box::new(script),
    )
    .await;

    let report = controller.run().await.unwrap();
    assert_eq!(report.phase, CrawlPhase::Stopped);
    assert_eq!(report.state.page_count, 2);
    assert!(report.checkpoint.is_none());
    assert_eq!(report.exports.len(), 1);

    let exported = std::fs::read_to_string(&report.exports[0]).unwrap();
    let urls: Vec<String> = serde_json::from_str(&exported).unwrap();
    assert_eq!(urls, report.state.discovered());
}

#[tokio::test]
async fn test_scrape_counts_successes_and_failures() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/one", &[]).await;
    mount_page(&server, "/two", &[]).await;

    let config = create_test_config(dir.path(), false);
    let session = Session::from_config(&config.session).unwrap();
    let options = ScrapeOptions::from_config(&config, OutputFormat::Html);

    let urls = vec![
        format!("{}/one", base),
        format!("{}/missing", base),
        "not a url".to_string(),
        format!("{}/two", base),
    ];
    let report = scrape_urls(&urls, &session, &RawHtmlConverter, &options)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.files.len(), 2);
    for file in &report.files {
        assert!(file.starts_with(&options.results_dir));
        assert_eq!(file.extension().unwrap(), "html");
        assert!(std::fs::read_to_string(file).unwrap().contains("<html>"));
    }
}

#[tokio::test]
async fn test_scrape_rejects_format_the_converter_cannot_render() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/one", &[]).await;

    let config = create_test_config(dir.path(), false);
    let session = Session::from_config(&config.session).unwrap();
    let options = ScrapeOptions::from_config(&config, OutputFormat::Json);

    let urls = vec![format!("{}/one", server.uri())];
    let result = scrape_urls(&urls, &session, &RawHtmlConverter, &options).await;

    assert!(matches!(
        result,
        Err(CrawlError::Export(OutputError::Format(_)))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!options.results_dir.exists());
}

#[tokio::test]
async fn test_scrape_single_page_then_search() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(
            "<html><body><h1>Gleaning</h1><p>Breadth-first Crawling</p><img src=\"a.png\"></body></html>"
                .to_string(),
        ))
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), false);
    let session = Session::from_config(&config.session).unwrap();
    let options = ScrapeOptions::from_config(&config, OutputFormat::Html);

    let page = scrape_url(
        &format!("{}/article", server.uri()),
        &session,
        &RawHtmlConverter,
        &options,
    )
    .await
    .unwrap();

    assert!(page.path.starts_with(&options.results_dir));
    assert_eq!(page.summary.headings, 1);
    assert_eq!(page.summary.paragraphs, 1);
    assert_eq!(page.summary.images, 1);

    let hits = search_results(&options.results_dir, "CRAWLING").unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].snippet.contains("breadth-first crawling"));
}
