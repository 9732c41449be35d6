use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::path::PathBuf;
use url::Url;

use registrator_core::{AdapterError, AdapterFactory, RegistryAdapter, Service};

use crate::model::{Registration, decode_services};
use crate::settings::ConsulSettings;

const TOKEN_HEADER: &str = "X-Consul-Token";
const TOKEN_ENV: &str = "CONSUL_HTTP_TOKEN";
const CA_CERT_ENV: &str = "CONSUL_CACERT";

/// Builds [`ConsulAdapter`]s from `consul://` and `consul-tls://` URIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsulFactory;

impl AdapterFactory for ConsulFactory {
    fn create(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>, AdapterError> {
        let settings = ConsulSettings::from_uri(uri)?
            .with_token(std::env::var(TOKEN_ENV).ok())
            .with_ca_cert(std::env::var_os(CA_CERT_ENV).map(PathBuf::from));
        Ok(Box::new(ConsulAdapter::new(settings)?))
    }
}

/// Registry backend speaking to a Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulAdapter {
    settings: ConsulSettings,
    client: Client,
}

impl ConsulAdapter {
    pub fn new(settings: ConsulSettings) -> Result<Self, AdapterError> {
        let invalid = |message: String| AdapterError::InvalidUri {
            uri: settings.base.to_string(),
            message,
        };

        let mut builder = Client::builder().timeout(settings.timeout);
        if let Some(path) = &settings.ca_cert {
            let pem = std::fs::read(path)
                .map_err(|e| invalid(format!("cannot read CA bundle {}: {e}", path.display())))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| invalid(format!("invalid CA bundle {}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder.build().map_err(|e| invalid(e.to_string()))?;

        tracing::debug!(base = %settings.base, timeout = ?settings.timeout, "Consul adapter ready");
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ConsulSettings {
        &self.settings
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.settings.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Send a request and turn non-success statuses into adapter errors.
    ///
    /// A 404 becomes [`AdapterError::NotFound`] when `id` names the service
    /// the request was about.
    async fn send(&self, request: RequestBuilder, id: Option<&str>) -> Result<Response, AdapterError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AdapterError::unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND
            && let Some(id) = id
        {
            return Err(AdapterError::NotFound { id: id.to_string() });
        }

        let body = response.text().await.unwrap_or_default();
        Err(AdapterError::Rejected {
            status: status.as_u16(),
            message: body.trim().to_string(),
        })
    }
}

#[async_trait]
impl RegistryAdapter for ConsulAdapter {
    async fn ping(&self) -> Result<(), AdapterError> {
        let url = self.settings.endpoint(&["v1", "status", "leader"])?;
        let response = self.send(self.client.get(url), None).await?;
        let leader = response
            .text()
            .await
            .map_err(|e| AdapterError::unavailable(e.to_string()))?;

        // An agent without a cluster leader answers `""`.
        if leader.trim().trim_matches('"').is_empty() {
            return Err(AdapterError::unavailable("Consul cluster has no leader"));
        }
        Ok(())
    }

    async fn register(&self, service: &Service) -> Result<(), AdapterError> {
        let url = self.settings.endpoint(&["v1", "agent", "service", "register"])?;
        let request = self.client.put(url).json(&Registration::from(service));
        self.send(request, None).await?;
        tracing::debug!(id = %service.id, "Registered with Consul");
        Ok(())
    }

    async fn deregister(&self, service: &Service) -> Result<(), AdapterError> {
        let url = self
            .settings
            .endpoint(&["v1", "agent", "service", "deregister", &service.id])?;
        self.send(self.client.put(url), Some(&service.id)).await?;
        tracing::debug!(id = %service.id, "Deregistered from Consul");
        Ok(())
    }

    async fn services(&self) -> Result<Vec<Service>, AdapterError> {
        let url = self.settings.endpoint(&["v1", "agent", "services"])?;
        let response = self.send(self.client.get(url), None).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| AdapterError::unavailable(e.to_string()))?;
        decode_services(&body).map_err(|e| AdapterError::Decode {
            message: e.to_string(),
        })
    }

    async fn refresh(&self, service: &Service) -> Result<(), AdapterError> {
        if service.ttl == 0 {
            return Ok(());
        }
        let check = format!("service:{}", service.id);
        let url = self.settings.endpoint(&["v1", "agent", "check", "pass", &check])?;
        self.send(self.client.put(url), Some(&service.id)).await?;
        Ok(())
    }
}
