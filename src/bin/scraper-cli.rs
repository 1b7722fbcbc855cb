//! Management CLI for the scraper's on-disk state.
//!
//! Operates directly on the lock marker and quota state files; safe to run
//! alongside a scheduled scraper except for the force commands, which exist
//! for operator recovery.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use newsfilter_scraper::config::load_config;
use newsfilter_scraper::lock::ExecutionLock;
use newsfilter_scraper::quota::QuotaTracker;

#[derive(Parser)]
#[command(name = "scraper-cli")]
#[command(about = "Inspect and manage newsfilter scraper state", long_about = None)]
struct Cli {
    /// Path to the scraper configuration file.
    #[arg(short, long, default_value = "scraper.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current quota usage and reset times
    Status,
    /// Inspect the execution lock marker
    Lock,
    /// Remove the lock marker regardless of ownership
    Unlock {
        /// Required; removing a live process's marker breaks mutual exclusion
        #[arg(long)]
        force: bool,
    },
    /// Zero the quota counter and re-anchor the window at now
    ResetQuota {
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Status => {
            let mut quota = QuotaTracker::new(config.quota);
            let status = quota.current_status();
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Lock => {
            let lock = ExecutionLock::new(config.lock);
            match lock.inspect() {
                Some(record) => {
                    println!("pid:      {}", record.pid);
                    println!("age:      {}s", record.age().as_secs());
                    println!("command:  {}", record.command);
                    println!(
                        "owner:    {}",
                        if record.owner_alive() { "alive" } else { "dead (stale)" }
                    );
                }
                None => println!("unlocked"),
            }
        }
        Commands::Unlock { force } => {
            if !force {
                eprintln!("refusing to unlock without --force");
                std::process::exit(2);
            }
            let mut lock = ExecutionLock::new(config.lock);
            lock.force_release();
            println!("lock marker removed");
        }
        Commands::ResetQuota { force } => {
            if !force {
                eprintln!("refusing to reset quota without --force");
                std::process::exit(2);
            }
            let mut quota = QuotaTracker::new(config.quota);
            quota.force_reset();
            let status = quota.current_status();
            println!("quota reset: {}/{} used", status.used, status.limit);
        }
    }

    Ok(())
}
