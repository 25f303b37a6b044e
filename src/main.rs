//! Bestseller service entrypoint.
//! Loads config, wires adapters, cache and timer, then serves the message surface.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use librovibe::cache::FileStore;
use librovibe::metrics::Metrics;
use librovibe::source::{http::Fetcher, http_registry};
use librovibe::{config, Orchestrator, TriggerSurface};

/// Compact logs by default; `LIBROVIBE_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("librovibe=info,warn"));

    let json = std::env::var("LIBROVIBE_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default()?;
    let metrics = Metrics::init()?;

    let fetcher = Fetcher::new(&cfg.http).context("building http client")?;
    let store = FileStore::open(&cfg.cache_path).await?;
    tracing::info!(cache = %store.path().display(), bind = %cfg.bind, "starting");

    let orchestrator = Orchestrator::new(http_registry(&fetcher), Arc::new(store));
    let surface = TriggerSurface::new(orchestrator);

    // Startup refresh runs in the background so the listener comes up immediately.
    let boot = surface.clone();
    tokio::spawn(async move {
        match boot.on_startup().await {
            Ok(report) => tracing::info!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                "startup refresh done"
            ),
            Err(e) => tracing::error!(error = %format!("{e:#}"), "startup trigger failed"),
        }
    });

    let app = librovibe::router(surface).merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
