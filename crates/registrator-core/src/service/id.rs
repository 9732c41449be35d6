use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SERVICE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(.+?)\]:([a-zA-Z0-9][a-zA-Z0-9_.-]+):([0-9]+)$")
        .unwrap_or_else(|e| unreachable!("service id pattern is valid: {e}"))
});

/// Content-addressed service identity: `[<host>]:<signature>:<port>`.
///
/// The host segment namespaces IDs per machine, the signature changes on
/// any edit of the definition file, and the port is kept in clear for
/// debugging. Only [`fmt::Display`] and [`FromStr`] deal with the string
/// form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceId {
    host: String,
    signature: String,
    port: u16,
}

impl ServiceId {
    pub fn new(host: impl Into<String>, signature: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            signature: signature.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this ID was produced on the host with the given identity.
    pub fn belongs_to(&self, host: &str) -> bool {
        self.host == host
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]:{}:{}", self.host, self.signature, self.port)
    }
}

/// The string does not look like a registrator-produced ID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a registrator service id: {0}")]
pub struct ForeignServiceId(pub String);

impl FromStr for ServiceId {
    type Err = ForeignServiceId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let foreign = || ForeignServiceId(s.to_string());
        let caps = SERVICE_ID_PATTERN.captures(s).ok_or_else(foreign)?;
        let port = caps[3].parse().map_err(|_| foreign())?;
        Ok(Self {
            host: caps[1].to_string(),
            signature: caps[2].to_string(),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn formats_bracketed_host() {
        let id = ServiceId::new("h1", "deadbeef", 8080);
        assert_eq!(id.to_string(), "[h1]:deadbeef:8080");
    }

    #[test]
    fn parses_own_format() {
        let id: ServiceId = "[node-7.dc1]:0af3:9090".parse().unwrap();
        assert_eq!(id.host(), "node-7.dc1");
        assert_eq!(id.signature(), "0af3");
        assert_eq!(id.port(), 9090);
    }

    #[rstest]
    #[case("web")]
    #[case("web-8080")]
    #[case("[h1]:abc")]
    #[case("[h1]::8080")]
    #[case("[]:abc:8080")]
    #[case("[h1]:abc:port")]
    #[case("[h1]:abc:99999")]
    #[case("prefix[h1]:abc:80")]
    fn rejects_foreign_ids(#[case] raw: &str) {
        assert!(raw.parse::<ServiceId>().is_err(), "{raw} should be foreign");
    }

    #[test]
    fn belongs_to_compares_host_segment() {
        let id = ServiceId::new("h1", "abc", 80);
        assert!(id.belongs_to("h1"));
        assert!(!id.belongs_to("h2"));
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(
            host in "[a-z][a-z0-9.-]{0,20}",
            signature in "[0-9a-f]{64}",
            port in any::<u16>(),
        ) {
            let id = ServiceId::new(host, signature, port);
            let parsed: ServiceId = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed, id);
        }
    }
}
