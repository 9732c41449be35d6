//! CLI argument parsing using clap derive

use clap::Parser;
use std::path::PathBuf;

use registrator_core::DaemonOptions;
use registrator_core::config::DEFAULT_CONFIG_DIR;

/// Keep a directory of service definition files registered with a service
/// registry.
///
/// Examples:
///   registrator consul://127.0.0.1:8500
///   registrator --ttl 30 --ttl-refresh 10 --cleanup consul://localhost
#[derive(Parser, Debug)]
#[command(name = "registrator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Registry backend URI; the scheme selects the backend
    #[arg(value_name = "REGISTRY_URI")]
    pub registry_uri: String,

    /// Directory holding service definition files and the ledger
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// TTL in seconds for registered services (0 disables expiry)
    #[arg(long, default_value_t = 0)]
    pub ttl: u64,

    /// Seconds between TTL refreshes; required with --ttl and must be lower
    #[arg(long, default_value_t = 0)]
    pub ttl_refresh: u64,

    /// Seconds between full resyncs (0 disables)
    #[arg(long, default_value_t = 0)]
    pub resync: u64,

    /// Connection attempts at startup beyond the first (-1 retries forever)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub retry_attempts: i64,

    /// Milliseconds between connection attempts
    #[arg(long, default_value_t = 2000, allow_negative_numbers = true)]
    pub retry_interval: i64,

    /// Address to register for definitions that do not set one
    #[arg(long)]
    pub ip: Option<String>,

    /// Remove dangling services of this host from the registry during sync
    #[arg(long)]
    pub cleanup: bool,

    /// Keep the ledger entry when deregistration fails, to retry on next sync
    #[arg(long)]
    pub retain_on_deregister_error: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_options(self) -> DaemonOptions {
        DaemonOptions {
            registry_uri: self.registry_uri,
            config_dir: self.config_dir,
            ttl: self.ttl,
            ttl_refresh: self.ttl_refresh,
            resync: self.resync,
            retry_attempts: self.retry_attempts,
            retry_interval_ms: self.retry_interval,
            host_ip: self.ip,
            cleanup: self.cleanup,
            retain_on_deregister_error: self.retain_on_deregister_error,
        }
    }
}
