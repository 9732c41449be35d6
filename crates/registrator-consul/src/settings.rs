use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use registrator_core::AdapterError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 8500;
const DEFAULT_HTTPS_PORT: u16 = 8501;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters decoded from a registry URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsulSettings {
    pub base: Url,
    /// Upper bound on every request. The Bridge holds its lock across
    /// backend calls, so this also bounds how long reconciliation stalls.
    pub timeout: Duration,
    pub token: Option<String>,
    pub ca_cert: Option<PathBuf>,
}

impl ConsulSettings {
    /// Decode `consul://host:port?timeout=secs` or the `consul-tls` variant.
    pub fn from_uri(uri: &Url) -> Result<Self, AdapterError> {
        let invalid = |message: String| AdapterError::InvalidUri {
            uri: uri.to_string(),
            message,
        };

        let (scheme, default_port) = match uri.scheme() {
            "consul" => ("http", DEFAULT_HTTP_PORT),
            "consul-tls" => ("https", DEFAULT_HTTPS_PORT),
            other => return Err(invalid(format!("unsupported scheme {other}"))),
        };

        let host = uri
            .host_str()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST);
        let port = uri.port().unwrap_or(default_port);
        let base = Url::parse(&format!("{scheme}://{host}:{port}/"))
            .map_err(|e| invalid(e.to_string()))?;

        let mut timeout = DEFAULT_TIMEOUT;
        for (key, value) in uri.query_pairs() {
            if key == "timeout" {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| invalid(format!("timeout must be whole seconds, got {value}")))?;
                timeout = Duration::from_secs(secs);
            }
        }

        Ok(Self {
            base,
            timeout,
            token: None,
            ca_cert: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_ca_cert(mut self, ca_cert: Option<PathBuf>) -> Self {
        self.ca_cert = ca_cert;
        self
    }

    /// Absolute URL for an API path, each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, AdapterError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| AdapterError::InvalidUri {
                uri: self.base.to_string(),
                message: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn settings(uri: &str) -> Result<ConsulSettings, AdapterError> {
        ConsulSettings::from_uri(&Url::parse(uri).unwrap())
    }

    #[rstest]
    #[case("consul://", "http://127.0.0.1:8500/")]
    #[case("consul://10.0.0.2", "http://10.0.0.2:8500/")]
    #[case("consul://agent.local:9500", "http://agent.local:9500/")]
    #[case("consul-tls://agent.local", "https://agent.local:8501/")]
    #[case("consul://[::1]:8500", "http://[::1]:8500/")]
    fn base_url_from_uri(#[case] uri: &str, #[case] expected: &str) {
        assert_eq!(settings(uri).unwrap().base.as_str(), expected);
    }

    #[test]
    fn timeout_from_query() {
        let s = settings("consul://localhost?timeout=3").unwrap();
        assert_eq!(s.timeout, Duration::from_secs(3));
        assert_eq!(settings("consul://localhost").unwrap().timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn bad_timeout_rejected() {
        assert!(matches!(
            settings("consul://localhost?timeout=soon"),
            Err(AdapterError::InvalidUri { .. })
        ));
    }

    #[test]
    fn foreign_scheme_rejected() {
        assert!(settings("etcd://localhost").is_err());
    }

    #[test]
    fn endpoint_joins_segments() {
        let s = settings("consul://localhost").unwrap();
        let url = s
            .endpoint(&["v1", "agent", "service", "deregister", "[h1]:abc:8080"])
            .unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 5);
        assert!(url.as_str().starts_with("http://localhost:8500/v1/agent/service/deregister/"));
    }

    #[test]
    fn endpoint_escapes_slashes() {
        let s = settings("consul://localhost").unwrap();
        let url = s.endpoint(&["v1", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8500/v1/a%2Fb");
    }

    #[test]
    fn empty_token_ignored() {
        let s = settings("consul://localhost")
            .unwrap()
            .with_token(Some(String::new()));
        assert!(s.token.is_none());
    }
}
