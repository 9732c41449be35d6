//! Registry adapter contract
//!
//! Concrete backends implement [`RegistryAdapter`] and make themselves
//! available by registering an [`AdapterFactory`] under a URI scheme in an
//! [`AdapterRegistry`]. The Bridge never names a concrete backend.

mod registry;

pub use registry::AdapterRegistry;

use async_trait::async_trait;
use url::Url;

use crate::service::Service;

/// Failures reported by a registry backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The backend has no service with this ID
    #[error("service not found in backend: {id}")]
    NotFound { id: String },

    /// The backend could not be reached
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    /// The backend answered but refused the request
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The adapter URI carries parameters this backend cannot use
    #[error("invalid adapter URI {uri}: {message}")]
    InvalidUri { uri: String, message: String },

    /// The backend answered with a payload the adapter cannot read
    #[error("failed to decode backend response: {message}")]
    Decode { message: String },
}

impl AdapterError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether the error means the service is already absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// The contract every registry backend implements.
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Cheap connectivity check, used by the startup retry loop.
    async fn ping(&self) -> Result<(), AdapterError>;

    /// Create or replace the registration for `service.id`.
    ///
    /// Must be idempotent: registering the same ID twice neither errors nor
    /// duplicates.
    async fn register(&self, service: &Service) -> Result<(), AdapterError>;

    /// Remove the registration for `service.id`.
    ///
    /// Implementations should report an unknown ID as
    /// [`AdapterError::NotFound`].
    async fn deregister(&self, service: &Service) -> Result<(), AdapterError>;

    /// Full snapshot of the backend, including services this process did not
    /// register.
    async fn services(&self) -> Result<Vec<Service>, AdapterError>;

    /// Renew the TTL of a registration. Backends without TTLs keep the
    /// default no-op.
    async fn refresh(&self, _service: &Service) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Produces adapters for one or more URI schemes.
pub trait AdapterFactory: Send + Sync {
    /// Build an adapter from the full registry URI.
    ///
    /// The scheme selected this factory; host, path and query are
    /// backend-specific connection parameters.
    fn create(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>, AdapterError>;
}
