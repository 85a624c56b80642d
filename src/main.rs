//! Live blog server.
//!
//! Serves the REST and WebSocket API over one data directory. Every flag can
//! also be set through its environment variable.

use anyhow::{Context, Result};
use clap::Parser;
use liveblog::{api, AppState, BlogConfig, HubConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Live blog server", long_about = None)]
struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "LIVEBLOG_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Directory holding content and registry journals.
    #[arg(long, env = "LIVEBLOG_DATA_DIR", default_value = "./liveblog-data")]
    data_dir: PathBuf,

    /// Log filter, overridden by RUST_LOG.
    #[arg(long, env = "LIVEBLOG_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// How long one delivery may wait on a slow subscriber, in milliseconds.
    /// Zero fails full queues immediately.
    #[arg(long, env = "LIVEBLOG_DELIVERY_TIMEOUT_MS", default_value_t = 5000)]
    delivery_timeout_ms: u64,

    /// Payloads queued per subscriber.
    #[arg(long, env = "LIVEBLOG_CHANNEL_BUFFER", default_value_t = 64)]
    channel_buffer: usize,

    /// Posts per page.
    #[arg(long, env = "LIVEBLOG_PAGE_SIZE", default_value_t = 25)]
    page_size: usize,
}

impl ServerConfig {
    fn blog_config(&self) -> BlogConfig {
        BlogConfig {
            path: self.data_dir.clone(),
            page_size: self.page_size,
            ..Default::default()
        }
    }

    fn hub_config(&self) -> HubConfig {
        HubConfig {
            buffer: self.channel_buffer,
            delivery_timeout: Duration::from_millis(self.delivery_timeout_ms),
        }
    }
}

fn setup_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    setup_logging(&config.log_level)?;

    let state = AppState::open(config.blog_config(), config.hub_config())
        .with_context(|| format!("failed to open {}", config.data_dir.display()))?;

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
