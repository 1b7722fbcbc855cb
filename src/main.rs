//! Scraper entry point for crontab execution.
//!
//! Exit code 0 when the run completed; 1 when it was skipped (lock held,
//! quota exhausted) or failed, so cron monitoring can alert on either.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsfilter_scraper::config::load_config;
use newsfilter_scraper::Scraper;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsfilter_scraper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("SCRAPER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("scraper.toml"));

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %config_path.display(), error = %e, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        base_url = %config.api.base_url,
        quota_limit = config.quota.max_daily_requests,
        reset_hour = config.quota.reset_hour,
        lock_path = %config.lock.path,
        "configuration loaded"
    );

    let mut scraper = match Scraper::new(config) {
        Ok(scraper) => scraper,
        Err(e) => {
            tracing::error!(error = %e, "could not construct scraper");
            return ExitCode::FAILURE;
        }
    };

    let report = scraper.run().await;
    if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
