//! Consul agent backend for registrator
//!
//! Talks to the local Consul agent's HTTP API. Selected by the `consul`
//! (plain HTTP) and `consul-tls` (HTTPS) URI schemes:
//!
//! ```text
//! consul://127.0.0.1:8500
//! consul-tls://consul.service:8501?timeout=5
//! ```
//!
//! Environment:
//!
//! - `CONSUL_HTTP_TOKEN`: ACL token sent as `X-Consul-Token`
//! - `CONSUL_CACERT`: PEM bundle trusted for `consul-tls`

mod adapter;
mod model;
mod settings;

pub use adapter::{ConsulAdapter, ConsulFactory};
pub use settings::ConsulSettings;

use std::sync::Arc;

use registrator_core::AdapterRegistry;

/// URI schemes served by this backend.
pub const SCHEMES: [&str; 2] = ["consul", "consul-tls"];

/// Make the Consul backend available under its schemes.
///
/// Returns the schemes that were newly registered; a scheme already taken
/// by another backend is left alone.
pub fn register(registry: &AdapterRegistry) -> Vec<&'static str> {
    let factory = Arc::new(ConsulFactory);
    SCHEMES
        .into_iter()
        .filter(|scheme| registry.register(factory.clone(), scheme))
        .collect()
}
