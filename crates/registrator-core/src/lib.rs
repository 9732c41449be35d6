//! Reconciliation engine for registrator
//!
//! Keeps a directory of service definition files in sync with a service
//! registry backend:
//!
//! - **Service identity**: content-addressed IDs `[host]:signature:port`
//! - **Identity ledger**: durable path → registration mapping
//! - **Adapter registry**: backends selected by URI scheme
//! - **Bridge**: add/remove/update decisions, full sync and dangling sweep
//!
//! # Architecture
//!
//! ```text
//!        registrator-cli (watcher, timers, signals)
//!                        |
//!                 registrator-core
//!                 /              \
//!      registrator-fs      RegistryAdapter impls
//!                          (registrator-consul, ...)
//! ```

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod ledger;
pub mod service;

pub use adapter::{AdapterError, AdapterFactory, AdapterRegistry, RegistryAdapter};
pub use bridge::{AddOutcome, Bridge, RemoveOutcome, SyncReport};
pub use config::{BridgeConfig, DaemonOptions, DeregisterPolicy, RetryAttempts, RetryPolicy};
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerEntry, LEDGER_FILE_NAME};
pub use service::{Service, ServiceDefinition, ServiceId};
