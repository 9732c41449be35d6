//! Service model
//!
//! A [`ServiceDefinition`] is what an operator writes into a definition
//! file. A [`Service`] is the registration unit handed to a backend: the
//! definition plus a derived ID and the configured TTL.

mod id;

pub use id::ServiceId;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// On-disk service definition document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl ServiceDefinition {
    /// Parse a definition from raw file bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// A registration unit as seen by a registry backend.
///
/// Services built from definition files always carry an ID in the
/// `[host]:signature:port` form; services listed from a backend may carry
/// any ID, including ones this host never produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub port: u16,
    pub ip: String,
    pub tags: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    /// Seconds; 0 means no expiry.
    pub ttl: u64,
}

impl Service {
    pub fn new(id: &ServiceId, definition: ServiceDefinition, ttl: u64) -> Self {
        Self {
            id: id.to_string(),
            name: definition.name,
            port: definition.port,
            ip: definition.address,
            tags: definition.tags,
            attrs: definition.attrs,
            ttl,
        }
    }

    /// A service carrying only an ID, enough to deregister it.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Parse this service's ID, if it was produced by a registrator.
    pub fn parsed_id(&self) -> Option<ServiceId> {
        self.id.parse().ok()
    }
}
