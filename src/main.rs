//! Command-line DNS lookup.
//!
//! Asks a resolver for the `A` records of a domain and prints the addresses,
//! the smallest TTL among the answers and how long the exchange took.
//!
//! # Usage
//!
//! ```bash
//! # Use the default resolver (8.8.8.8)
//! dns-dig example.com
//!
//! # Pick the resolver and deadline
//! dns-dig example.com --server 1.1.1.1 --timeout 2
//!
//! # Read defaults from a config file
//! dns-dig example.com --config dig.toml
//! ```
//!
//! Output looks like:
//!
//! ```text
//! Querying 8.8.8.8 for A records of example.com...
//! ------------------------------------
//! Answer Section:
//!   - 93.184.216.34
//! TTL: 3600s
//! Query time: 12.3ms
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dns_dig::{Config, dig};

#[derive(Debug, Parser)]
#[command(name = "dns-dig", version)]
#[command(about = "Look up the IPv4 addresses of a domain over UDP")]
struct Cli {
    /// Domain name to resolve
    domain: String,

    /// Resolver to query, host or IP (port is always 53)
    #[arg(short, long)]
    server: Option<String>,

    /// Deadline for the lookup, in seconds
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings resolve as command-line flag, then config file, then defaults.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Querying {} for A records of {}...",
        config.server, cli.domain
    );
    println!("------------------------------------");

    match dig(&config.server, &cli.domain, config.timeout()) {
        Ok(response) => {
            if response.ips().is_empty() {
                println!("Answer Section: No A records found.");
            } else {
                println!("Answer Section:");
                for ip in response.ips() {
                    println!("  - {ip}");
                }
            }
            println!("TTL: {}s", response.ttl());
            println!("Query time: {:.1?}", response.elapsed());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            if err.is_timeout() {
                eprintln!(
                    "No reply within {}s; the server may be unreachable.",
                    config.timeout_secs
                );
            } else if err.is_temporary() {
                eprintln!("The failure may be temporary; try again later.");
            }
            ExitCode::FAILURE
        }
    }
}
