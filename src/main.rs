//! Sheetline - serve a spreadsheet-backed timeline
//!
//! Loads the timeline once at startup, then serves it on every path. A POST
//! to any path re-reads the spreadsheet before rendering.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sheetline::cache::SnapshotCache;
use sheetline::cli::{Cli, ServiceConfig};
use sheetline::data::fetch::CREDENTIALS_ENV;
use sheetline::data::{Fetcher, GoogleSheets};
use sheetline::{shutdown, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_cli(&cli, std::env::var(CREDENTIALS_ENV).ok())?;

    let client = reqwest::Client::builder()
        .timeout(config.fetch.timeout)
        .build()
        .context("building HTTP client")?;
    let fetcher = Fetcher::new(
        Arc::new(GoogleSheets::with_client(client)),
        config.fetch.clone(),
    );

    let cache = match SnapshotCache::initialize(fetcher).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            tracing::error!(error = %e, "initial timeline fetch failed");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");

    let token = CancellationToken::new();
    shutdown::spawn_signal_listener(token.clone())?;

    web::serve(
        listener,
        cache,
        token,
        config.request_timeout,
        config.shutdown_timeout,
    )
    .await?;
    tracing::info!("successful shutdown");
    Ok(())
}
