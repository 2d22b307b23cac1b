//! Integration tests for the HTTP surface
//!
//! Runs the real server on an ephemeral port against an in-memory
//! spreadsheet and drives it with reqwest.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sheetline::cache::SnapshotCache;
use sheetline::data::fetch::{FetchConfig, ERAS_RANGE, EVENTS_RANGE};
use sheetline::data::{Connector, FetchError, Fetcher, Row, SheetSource};
use sheetline::web;

/// Sheet contents handed out by [`MemorySheets`]
#[derive(Clone, Default)]
struct Contents {
    events: Vec<Row>,
    eras: Vec<Row>,
    failure: Option<String>,
    delay: Duration,
}

#[derive(Clone, Default)]
struct MemorySheets {
    contents: Arc<Mutex<Contents>>,
}

impl MemorySheets {
    fn update(&self, f: impl FnOnce(&mut Contents)) {
        f(&mut self.contents.lock());
    }
}

struct MemorySession(Contents);

#[async_trait]
impl SheetSource for MemorySession {
    async fn read_range(&self, range: &str) -> Result<Vec<Row>, FetchError> {
        Ok(match range {
            EVENTS_RANGE => self.0.events.clone(),
            ERAS_RANGE => self.0.eras.clone(),
            _ => Vec::new(),
        })
    }
}

#[async_trait]
impl Connector for MemorySheets {
    async fn connect(&self, _: &str, _: &str) -> Result<Box<dyn SheetSource>, FetchError> {
        let contents = self.contents.lock().clone();
        tokio::time::sleep(contents.delay).await;
        match &contents.failure {
            Some(message) => Err(FetchError::Upstream(message.clone())),
            None => Ok(Box::new(MemorySession(contents))),
        }
    }
}

fn rows(values: Value) -> Vec<Row> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_array().unwrap().clone())
        .collect()
}

struct TestServer {
    addr: SocketAddr,
    sheets: MemorySheets,
    cache: Arc<SnapshotCache>,
    shutdown: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(sheets: MemorySheets, drain_timeout: Duration) -> Self {
        Self::start_with_request_timeout(sheets, Duration::from_secs(30), drain_timeout).await
    }

    async fn start_with_request_timeout(
        sheets: MemorySheets,
        request_timeout: Duration,
        drain_timeout: Duration,
    ) -> Self {
        let fetcher = Fetcher::new(
            Arc::new(sheets.clone()),
            FetchConfig {
                credentials: Some("{}".to_string()),
                spreadsheet_id: Some("sheet".to_string()),
                timeout: Duration::from_secs(10),
            },
        );
        let cache = Arc::new(SnapshotCache::initialize(fetcher).await.unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(web::serve(
            listener,
            Arc::clone(&cache),
            shutdown.clone(),
            request_timeout,
            drain_timeout,
        ));

        Self {
            addr,
            sheets,
            cache,
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

fn initial_sheets() -> MemorySheets {
    let sheets = MemorySheets::default();
    sheets.update(|c| {
        c.events = rows(json!([
            ["2020-1", "", "First", "About <i>first</i>"],
            ["2021-6", "2021-8", "Second", "", "Work"],
        ]));
        c.eras = rows(json!([["2019-1", "2022-12", "Era one"]]));
    });
    sheets
}

/// Pulls the inlined timeline JSON back out of a rendered page.
fn page_timeline(page: &str) -> Value {
    let marker = r#"id="timeline-data">"#;
    let start = page.find(marker).expect("timeline script element") + marker.len();
    let end = start + page[start..].find("</script>").unwrap();
    serde_json::from_str(&page[start..end]).unwrap()
}

#[tokio::test]
async fn test_get_renders_cached_timeline() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;

    let response = reqwest::get(server.url("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"), "{content_type}");
    assert!(response.headers().contains_key("last-modified"));
    let page = response.text().await.unwrap();
    assert_eq!(
        page_timeline(&page),
        json!({
            "events": [
                {
                    "start_date": {"year": 2020, "month": 1},
                    "text": {"headline": "First", "text": "About <i>first</i>"}
                },
                {
                    "start_date": {"year": 2021, "month": 6},
                    "end_date": {"year": 2021, "month": 8},
                    "text": {"headline": "Second"},
                    "group": "Work"
                }
            ],
            "eras": [
                {
                    "start_date": {"year": 2019, "month": 1},
                    "end_date": {"year": 2022, "month": 12},
                    "text": {"headline": "Era one"}
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_get_on_any_path_serves_page() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;

    for path in ["/timeline", "/a/b/c", "/?ignored=1"] {
        let response = reqwest::get(server.url(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn test_get_does_not_refetch() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;
    server
        .sheets
        .update(|c| c.events = rows(json!([["2030-1", "", "Future"]])));

    let page = reqwest::get(server.url("/")).await.unwrap().text().await.unwrap();

    assert_eq!(page_timeline(&page)["events"][0]["text"]["headline"], "First");
}

#[tokio::test]
async fn test_post_refreshes_then_renders() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;
    server
        .sheets
        .update(|c| c.events = rows(json!([["2030-1", "", "Future"]])));

    let response = reqwest::Client::new()
        .post(server.url("/anything"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let timeline = page_timeline(&response.text().await.unwrap());
    assert_eq!(timeline["events"].as_array().unwrap().len(), 1);
    assert_eq!(timeline["events"][0]["text"]["headline"], "Future");
    assert_eq!(server.cache.get().events[0].text.title, "Future");
}

#[tokio::test]
async fn test_failed_post_returns_error_and_keeps_snapshot() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;
    server
        .sheets
        .update(|c| c.failure = Some("spreadsheet unavailable".to_string()));

    let response = reqwest::Client::new()
        .post(server.url("/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("fetch error: "), "{body}");
    assert!(body.contains("spreadsheet unavailable"), "{body}");

    let page = reqwest::get(server.url("/")).await.unwrap().text().await.unwrap();
    assert_eq!(page_timeline(&page)["events"][0]["text"]["headline"], "First");
}

#[tokio::test]
async fn test_post_with_bad_row_reports_line_and_field() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;
    server.sheets.update(|c| {
        c.events = rows(json!([
            ["2020-1", "", "ok"],
            ["2020-1", "", "ok"],
            ["2020-1", "2020-99", "bad end"],
        ]))
    });

    let response = reqwest::Client::new()
        .post(server.url("/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("fetch error: line 4: end:"), "{body}");
    assert_eq!(server.cache.get().events.len(), 2);
    assert_eq!(server.cache.get().events[0].text.title, "First");
}

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;

    let response = reqwest::Client::new()
        .delete(server.url("/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_get_during_slow_refresh_serves_previous_snapshot() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;
    server.sheets.update(|c| {
        c.events = rows(json!([["2030-1", "", "Future"]]));
        c.delay = Duration::from_millis(300);
    });

    let client = reqwest::Client::new();
    let post = tokio::spawn(client.post(server.url("/")).send());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let during = client.get(server.url("/")).send().await.unwrap().text().await.unwrap();
    assert_eq!(page_timeline(&during)["events"][0]["text"]["headline"], "First");

    let response = post.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let after = client.get(server.url("/")).send().await.unwrap().text().await.unwrap();
    assert_eq!(page_timeline(&after)["events"][0]["text"]["headline"], "Future");
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;
    assert_eq!(
        reqwest::get(server.url("/")).await.unwrap().status(),
        StatusCode::OK
    );

    server.shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server should stop after cancellation")
        .unwrap();
    assert!(result.is_ok());
    let client = reqwest::Client::builder().pool_max_idle_per_host(0).build().unwrap();
    assert!(client.get(format!("http://{}/", server.addr)).send().await.is_err());
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_request() {
    let server = TestServer::start(initial_sheets(), Duration::from_secs(5)).await;
    server
        .sheets
        .update(|c| c.delay = Duration::from_millis(300));

    let post = tokio::spawn(reqwest::Client::new().post(server.url("/")).send());
    tokio::time::sleep(Duration::from_millis(50)).await;
    server.shutdown.cancel();

    let response = post.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server should stop once drained")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shutdown_gives_up_after_deadline() {
    let server = TestServer::start(initial_sheets(), Duration::from_millis(100)).await;
    server.sheets.update(|c| c.delay = Duration::from_secs(30));

    let _post = tokio::spawn(reqwest::Client::new().post(server.url("/")).send());
    tokio::time::sleep(Duration::from_millis(50)).await;
    server.shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server should stop at the drain deadline")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_request_exceeding_timeout_is_cut_off() {
    let server = TestServer::start_with_request_timeout(
        initial_sheets(),
        Duration::from_millis(100),
        Duration::from_secs(5),
    )
    .await;
    server.sheets.update(|c| {
        c.events = rows(json!([["2030-1", "", "Future"]]));
        c.delay = Duration::from_secs(30);
    });

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        reqwest::Client::new().post(server.url("/")).send(),
    )
    .await
    .expect("request should be cut off by the server")
    .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(server.cache.get().events[0].text.title, "First");
    let page = reqwest::get(server.url("/")).await.unwrap().text().await.unwrap();
    assert_eq!(page_timeline(&page)["events"][0]["text"]["headline"], "First");
}
