//! Bridge and process configuration
//!
//! [`DaemonOptions`] is the flat set of operator-facing options. It is
//! validated once at startup and then split into the runtime types the
//! Bridge consumes: [`BridgeConfig`] and [`RetryPolicy`].

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default directory holding service definition files.
pub const DEFAULT_CONFIG_DIR: &str = "/etc/registrator";

/// What `remove` does with the ledger entry when deregistration fails with
/// anything other than "not found".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeregisterPolicy {
    /// Clear the entry anyway and rely on the dangling sweep.
    #[default]
    AlwaysClear,
    /// Keep the entry so a later remove or sync can retry.
    RetainOnError,
}

/// Runtime configuration of a Bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Host segment of every service ID produced here.
    pub host_identity: String,
    /// Address used for definitions that leave `address` empty.
    pub host_ip: Option<String>,
    /// TTL handed to the backend, in seconds; 0 disables expiry.
    pub refresh_ttl: u64,
    /// Heartbeat period, in seconds; 0 disables refresh.
    pub refresh_interval: u64,
    /// Directory scanned for definition files; also holds the ledger.
    pub config_dir: PathBuf,
    /// Whether sync sweeps dangling backend entries.
    pub cleanup: bool,
    pub deregister_policy: DeregisterPolicy,
}

impl BridgeConfig {
    /// A configuration for `config_dir` using the local hostname.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname cannot be resolved.
    pub fn for_dir(config_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_identity(config_dir, local_host_identity()?))
    }

    /// A configuration with an explicit host identity.
    pub fn with_identity(config_dir: impl Into<PathBuf>, host_identity: impl Into<String>) -> Self {
        Self {
            host_identity: host_identity.into(),
            host_ip: None,
            refresh_ttl: 0,
            refresh_interval: 0,
            config_dir: config_dir.into(),
            cleanup: false,
            deregister_policy: DeregisterPolicy::default(),
        }
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_deregister_policy(mut self, policy: DeregisterPolicy) -> Self {
        self.deregister_policy = policy;
        self
    }

    pub fn with_ttl(mut self, ttl: u64, refresh_interval: u64) -> Self {
        self.refresh_ttl = ttl;
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn with_host_ip(mut self, host_ip: impl Into<String>) -> Self {
        self.host_ip = Some(host_ip.into());
        self
    }
}

/// Resolve the local hostname used to namespace service IDs.
pub fn local_host_identity() -> Result<String> {
    hostname::get()
        .map_err(|e| Error::HostIdentity {
            message: e.to_string(),
        })?
        .into_string()
        .map_err(|raw| Error::HostIdentity {
            message: format!("hostname is not valid UTF-8: {raw:?}"),
        })
}

/// How many times startup pings the backend before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAttempts {
    /// Retry up to this many times after the first attempt.
    Limited(u64),
    Infinite,
}

/// Startup connection retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: RetryAttempts,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: RetryAttempts::Limited(0),
            interval: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Whether the attempt numbered `attempt` (0-based) is the last one.
    pub fn is_last(&self, attempt: u64) -> bool {
        match self.attempts {
            RetryAttempts::Limited(max) => attempt >= max,
            RetryAttempts::Infinite => false,
        }
    }
}

/// Operator-facing process options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonOptions {
    pub registry_uri: String,
    pub config_dir: PathBuf,
    /// Seconds; 0 means no expiry.
    pub ttl: u64,
    /// Seconds between TTL refreshes; 0 disables.
    pub ttl_refresh: u64,
    /// Seconds between full resyncs; 0 disables.
    pub resync: u64,
    /// `-1` retries forever.
    pub retry_attempts: i64,
    /// Milliseconds between connection attempts.
    pub retry_interval_ms: i64,
    pub host_ip: Option<String>,
    pub cleanup: bool,
    pub retain_on_deregister_error: bool,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            registry_uri: String::new(),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            ttl: 0,
            ttl_refresh: 0,
            resync: 0,
            retry_attempts: 0,
            retry_interval_ms: 2000,
            host_ip: None,
            cleanup: false,
            retain_on_deregister_error: false,
        }
    }
}

impl DaemonOptions {
    /// Reject inconsistent options before anything is constructed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.registry_uri.trim().is_empty() {
            return Err(Error::invalid_config("missing required registry URI"));
        }
        if (self.ttl == 0) != (self.ttl_refresh == 0) {
            return Err(Error::invalid_config(
                "--ttl and --ttl-refresh must be specified together or not at all",
            ));
        }
        if self.ttl > 0 && self.ttl <= self.ttl_refresh {
            return Err(Error::invalid_config(
                "--ttl must be greater than --ttl-refresh",
            ));
        }
        if self.retry_interval_ms <= 0 {
            return Err(Error::invalid_config(
                "--retry-interval must be greater than 0",
            ));
        }
        if self.retry_attempts < -1 {
            return Err(Error::invalid_config(
                "--retry-attempts must be -1 (infinite) or a non-negative count",
            ));
        }
        Ok(())
    }

    /// Connection retry policy derived from the options.
    pub fn retry_policy(&self) -> RetryPolicy {
        let attempts = match u64::try_from(self.retry_attempts) {
            Ok(max) => RetryAttempts::Limited(max),
            Err(_) => RetryAttempts::Infinite,
        };
        RetryPolicy {
            attempts,
            interval: Duration::from_millis(self.retry_interval_ms.unsigned_abs()),
        }
    }

    /// Bridge configuration derived from the options.
    pub fn bridge_config(&self, host_identity: impl Into<String>) -> BridgeConfig {
        let policy = if self.retain_on_deregister_error {
            DeregisterPolicy::RetainOnError
        } else {
            DeregisterPolicy::AlwaysClear
        };
        let mut config = BridgeConfig::with_identity(&self.config_dir, host_identity)
            .with_ttl(self.ttl, self.ttl_refresh)
            .with_cleanup(self.cleanup)
            .with_deregister_policy(policy);
        config.host_ip = self.host_ip.clone().filter(|ip| !ip.is_empty());
        config
    }

    pub fn resync_interval(&self) -> Option<Duration> {
        (self.resync > 0).then(|| Duration::from_secs(self.resync))
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.ttl_refresh > 0).then(|| Duration::from_secs(self.ttl_refresh))
    }
}
