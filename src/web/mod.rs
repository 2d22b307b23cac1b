//! HTTP surface
//!
//! Every path answers `GET` with the rendered page for the current
//! snapshot and `POST` with a refresh followed by the same page.

mod error;
mod render;

pub use error::HandlerError;
pub use render::{render_page, INDEX_TEMPLATE};

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::cache::{Snapshot, SnapshotCache};

/// HTTP-date layout for `Last-Modified`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Builds the page router.
///
/// Requests still running after `request_timeout` are answered with
/// `408 Request Timeout`; an abandoned refresh leaves the snapshot as it was.
pub fn router(cache: Arc<SnapshotCache>, request_timeout: Duration) -> Router {
    let page: MethodRouter = get(handle_get).post(handle_post);

    Router::new()
        .fallback_service(page)
        .layer(Extension(cache))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn handle_get(
    Extension(cache): Extension<Arc<SnapshotCache>>,
) -> Result<Response, HandlerError> {
    page_response(&cache.snapshot())
}

async fn handle_post(
    Extension(cache): Extension<Arc<SnapshotCache>>,
) -> Result<Response, HandlerError> {
    cache.refresh().await?;
    page_response(&cache.snapshot())
}

fn page_response(snapshot: &Snapshot) -> Result<Response, HandlerError> {
    let html = render_page(&snapshot.timeline)?;
    let last_modified = snapshot.fetched_at.format(HTTP_DATE_FORMAT).to_string();

    Ok((
        [
            (header::LAST_MODIFIED, last_modified),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Html(html),
    )
        .into_response())
}

/// Serves `cache` on `listener` until `shutdown` is cancelled.
///
/// Each request is bounded by `request_timeout`. After cancellation the listener stops accepting and in-flight requests
/// get `drain_timeout` to finish; whatever is still running after that is
/// aborted.
pub async fn serve(
    listener: TcpListener,
    cache: Arc<SnapshotCache>,
    shutdown: CancellationToken,
    request_timeout: Duration,
    drain_timeout: Duration,
) -> io::Result<()> {
    let server = axum::serve(listener, router(cache, request_timeout))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let mut task = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut task => return flatten(joined),
        _ = shutdown.cancelled() => {}
    }

    tracing::info!(
        timeout_secs = drain_timeout.as_secs_f64(),
        "shutdown requested; draining in-flight requests"
    );
    match tokio::time::timeout(drain_timeout, &mut task).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            task.abort();
            tracing::warn!("drain deadline passed; dropping remaining connections");
            Ok(())
        }
    }
}

fn flatten(joined: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    joined.map_err(io::Error::other)?
}
