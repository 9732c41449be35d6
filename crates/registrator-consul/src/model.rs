//! Consul agent API payloads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use registrator_core::Service;

/// Body of `PUT /v1/agent/service/register`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Registration<'a> {
    #[serde(rename = "ID")]
    pub id: &'a str,
    pub name: &'a str,
    pub port: u16,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub address: &'a str,
    pub tags: &'a [String],
    pub meta: &'a BTreeMap<String, String>,
    pub enable_tag_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<TtlCheck>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TtlCheck {
    #[serde(rename = "TTL")]
    pub ttl: String,
}

impl<'a> From<&'a Service> for Registration<'a> {
    fn from(service: &'a Service) -> Self {
        Self {
            id: &service.id,
            name: &service.name,
            port: service.port,
            address: &service.ip,
            tags: &service.tags,
            meta: &service.attrs,
            enable_tag_override: true,
            check: (service.ttl > 0).then(|| TtlCheck {
                ttl: format!("{}s", service.ttl),
            }),
        }
    }
}

/// One value of the `GET /v1/agent/services` map.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub meta: Option<BTreeMap<String, String>>,
}

impl From<AgentService> for Service {
    fn from(agent: AgentService) -> Self {
        Self {
            id: agent.id,
            name: agent.service,
            port: agent.port,
            ip: agent.address,
            tags: agent.tags.unwrap_or_default(),
            attrs: agent.meta.unwrap_or_default(),
            ttl: 0,
        }
    }
}

/// Decode the agent's service map into services, ordered by ID.
pub(crate) fn decode_services(body: &[u8]) -> serde_json::Result<Vec<Service>> {
    let map: BTreeMap<String, AgentService> = serde_json::from_slice(body)?;
    Ok(map.into_values().map(Service::from).collect())
}
