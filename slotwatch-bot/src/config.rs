use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use clap::Parser;
use slotwatch_core::EngineConfig;

#[derive(Debug, Parser)]
/// Startup configuration, read from flags, the environment, or a `.env` file.
#[command(author, version, about = "Watches NJ MVC for newly opened appointment slots")]
pub(crate) struct Cli {
    /// Seconds to sleep between poll cycles.
    #[arg(long, env = "CHECK_INTERVAL_SECONDS", default_value_t = 60)]
    pub interval_secs: u64,

    /// Booking pages fetched concurrently within one cycle.
    #[arg(long, env = "SLOTWATCH_MAX_FETCHES", default_value_t = 4)]
    pub max_concurrent_fetches: usize,

    /// Seconds a single notification may take before it counts as failed.
    #[arg(long, env = "SLOTWATCH_DELIVERY_TIMEOUT", default_value_t = 15)]
    pub delivery_timeout_secs: u64,

    /// Seconds before an HTTP request to the booking site is abandoned.
    #[arg(long, env = "SLOTWATCH_HTTP_TIMEOUT", default_value_t = 20)]
    pub http_timeout_secs: u64,

    /// POST digests to this URL instead of writing them to the log.
    #[arg(long, env = "SLOTWATCH_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// File that receives a copy of the log output.
    #[arg(long, env = "SLOTWATCH_LOG_FILE", default_value = "slotwatch.log")]
    pub log_file: PathBuf,
}

impl Cli {
    pub(crate) fn engine_config(&self) -> Result<EngineConfig> {
        ensure!(self.interval_secs > 0, "poll interval must be at least one second");
        ensure!(
            self.max_concurrent_fetches > 0,
            "at least one concurrent fetch is required"
        );
        ensure!(
            self.delivery_timeout_secs > 0,
            "delivery timeout must be at least one second"
        );
        ensure!(
            self.http_timeout_secs > 0,
            "HTTP timeout must be at least one second"
        );

        Ok(EngineConfig {
            interval: Duration::from_secs(self.interval_secs),
            max_concurrent_fetches: self.max_concurrent_fetches,
            delivery_timeout: Duration::from_secs(self.delivery_timeout_secs),
        })
    }

    pub(crate) fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
