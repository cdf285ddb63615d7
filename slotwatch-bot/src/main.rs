//! Slotwatch bot: polls the NJ MVC appointment wizard for newly opened slots
//! and notifies subscribers, with subscriptions managed from the console.

mod config;
mod console;
mod sink;

use std::{
    fs::OpenOptions,
    io,
    path::Path,
    sync::Arc,
};

use anyhow::{Context as _, Result};
use clap::Parser;
use reqwest::Client;
use slotwatch_core::{NotificationSink, PollEngine, SlotWatchService, SubscriptionRegistry};
use slotwatch_provider_njmvc as njmvc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Cli;
use crate::sink::{LogSink, WebhookSink};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; flags and the environment still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_tracing(&cli.log_file)?;
    let engine_config = cli.engine_config()?;

    // HTTP + service setup
    let client = Client::builder()
        .user_agent("slotwatch/0.1")
        .timeout(cli.http_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let site = njmvc::plugin(client.clone());
    let registry = Arc::new(SubscriptionRegistry::new());
    let service = Arc::new(SlotWatchService::new(
        Arc::clone(&site.catalog),
        Arc::clone(&registry),
    ));

    let sink: Arc<dyn NotificationSink> = match cli.webhook_url {
        Some(url) => {
            info!(%url, "Delivering digests to webhook");
            Arc::new(WebhookSink::new(client, url))
        }
        None => {
            info!("Delivering digests to the log");
            Arc::new(LogSink)
        }
    };

    info!(site = %site.name, "Starting slot watcher");
    let mut engine = PollEngine::new(site.catalog, registry, site.source, sink, engine_config);

    // Poll loop and console run side by side until Ctrl-C or SIGTERM
    let shutdown = CancellationToken::new();
    let poller = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { engine.run(shutdown).await }
    });
    let console = tokio::spawn(console::run(service, shutdown.clone()));

    let signal = shutdown_signal().await?;
    info!(signal, "Shutdown signal received");
    shutdown.cancel();

    poller.await.context("poll loop task failed")?;
    console.await.context("console task failed")?;
    Ok(())
}

/// Wait for Ctrl-C or, on Unix, SIGTERM and name the one that arrived.
async fn shutdown_signal() -> Result<&'static str> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .context("failed to install Ctrl-C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => result.map(|()| "ctrl-c"),
        result = terminate => result.map(|()| "sigterm"),
    }
}

/// Log to stderr and append a plain-text copy to `log_file`.
fn init_tracing(log_file: &Path) -> Result<WorkerGuard> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let env_filter = || {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy()
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(env_filter()))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(env_filter()),
        )
        .init();

    Ok(guard)
}
