//! registrator daemon
//!
//! Composition root for the `registrator` binary: argument parsing, logging,
//! the config-directory watcher and the periodic resync/refresh tasks.

pub mod cli;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod watch;

pub use error::{CliError, Result};
