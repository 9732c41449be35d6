//! Bridge: the reconciliation engine
//!
//! The Bridge turns definition-file events into backend registrations and
//! keeps the identity ledger in step. Every mutating operation runs inside
//! the Bridge's single critical section (`gate`), so file events, periodic
//! syncs and refreshes are serialized against each other. Backend calls are
//! made while the gate is held.

mod connect;
mod outcome;
mod sync;

pub use outcome::{AddOutcome, RemoveOutcome, SyncReport};

use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};
use url::Url;

use crate::adapter::{AdapterError, AdapterRegistry, RegistryAdapter};
use crate::config::{BridgeConfig, DeregisterPolicy};
use crate::ledger::Ledger;
use crate::service::{Service, ServiceDefinition, ServiceId};
use crate::{Error, Result};
use registrator_fs::{content_signature, io, DefinitionFilter};

/// Proof that the caller is inside the Bridge critical section.
type Held<'a> = MutexGuard<'a, ()>;

/// Keeps definition files and backend registrations in sync.
pub struct Bridge {
    registry: Box<dyn RegistryAdapter>,
    ledger: Ledger,
    config: BridgeConfig,
    filter: DefinitionFilter,
    gate: Mutex<()>,
}

impl Bridge {
    /// Build a Bridge whose backend is selected by the scheme of
    /// `adapter_uri`.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable URI, an unregistered scheme, a factory that
    /// rejects the URI, or an unreadable ledger.
    pub fn new(adapter_uri: &str, config: BridgeConfig, adapters: &AdapterRegistry) -> Result<Self> {
        let uri = Url::parse(adapter_uri).map_err(|source| Error::InvalidAdapterUri {
            uri: adapter_uri.to_string(),
            source,
        })?;

        let factory = adapters
            .lookup(uri.scheme())
            .ok_or_else(|| Error::UnknownAdapter {
                uri: adapter_uri.to_string(),
                known: adapters.schemes().join(", "),
            })?;

        tracing::info!(scheme = uri.scheme(), uri = adapter_uri, "using adapter");
        Self::with_adapter(factory.create(&uri)?, config)
    }

    /// Build a Bridge around an already constructed adapter.
    ///
    /// # Errors
    ///
    /// Fails if the ledger in the config directory exists but is unreadable.
    pub fn with_adapter(registry: Box<dyn RegistryAdapter>, mut config: BridgeConfig) -> Result<Self> {
        // Event paths arrive absolute; ledger keys must use the same prefix.
        if let Ok(canonical) = dunce::canonicalize(&config.config_dir) {
            config.config_dir = canonical;
        }
        let ledger = Ledger::open(&config.config_dir)?;
        let filter = DefinitionFilter::default().reserve(ledger.path());
        tracing::debug!(
            ledger = %ledger.path().display(),
            entries = ledger.len(),
            host = %config.host_identity,
            "bridge ready"
        );

        Ok(Self {
            registry,
            ledger,
            config,
            filter,
            gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Whether `path` is a definition file this Bridge reacts to.
    pub fn is_definition_file(&self, path: &Path) -> bool {
        self.filter.matches(path)
    }

    /// Check backend connectivity once.
    pub async fn ping(&self) -> std::result::Result<(), AdapterError> {
        self.registry.ping().await
    }

    /// Build the service described by the definition file at `path`.
    ///
    /// Pure given the file contents and configuration: unchanged bytes
    /// always yield the same ID.
    pub fn new_service_from_file(&self, path: &Path) -> Result<Service> {
        let bytes = io::read_bytes(path).map_err(|source| Error::DefinitionRead {
            path: path.to_path_buf(),
            source,
        })?;
        let definition =
            ServiceDefinition::from_slice(&bytes).map_err(|source| Error::DefinitionParse {
                path: path.to_path_buf(),
                source,
            })?;

        let id = ServiceId::new(
            self.config.host_identity.as_str(),
            content_signature(&bytes),
            definition.port,
        );
        let mut service = Service::new(&id, definition, self.config.refresh_ttl);
        if service.ip.is_empty()
            && let Some(host_ip) = &self.config.host_ip
        {
            service.ip = host_ip.clone();
        }
        Ok(service)
    }

    /// Register the service defined at `path` unless the ledger already
    /// holds its current ID.
    pub async fn add(&self, path: &Path) -> AddOutcome {
        let held = self.gate.lock().await;
        self.add_locked(&held, path, false).await
    }

    /// Deregister whatever the ledger recorded for `path`.
    pub async fn remove(&self, path: &Path) -> RemoveOutcome {
        let held = self.gate.lock().await;
        self.remove_locked(&held, path).await
    }

    /// Remove then add `path`, as two backend calls inside one critical
    /// section.
    pub async fn update(&self, path: &Path) -> (RemoveOutcome, AddOutcome) {
        let held = self.gate.lock().await;
        let removed = self.remove_locked(&held, path).await;
        if matches!(removed, RemoveOutcome::Retained(_)) {
            return (removed, AddOutcome::RegisterFailed);
        }
        let added = self.add_locked(&held, path, false).await;
        (removed, added)
    }

    /// React to a content change of `path`.
    ///
    /// Unchanged content is a no-op. A file that no longer parses keeps its
    /// current registration. Otherwise the old registration is replaced.
    pub async fn apply_change(&self, path: &Path) -> AddOutcome {
        let held = self.gate.lock().await;
        let service = match self.new_service_from_file(path) {
            Ok(service) => service,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "changed definition is invalid, keeping current registration");
                return AddOutcome::Invalid;
            }
        };
        self.add_candidate(&held, path, Ok(service), false).await
    }

    async fn add_locked(&self, held: &Held<'_>, path: &Path, quiet: bool) -> AddOutcome {
        let candidate = self.new_service_from_file(path);
        self.add_candidate(held, path, candidate, quiet).await
    }

    async fn add_candidate(
        &self,
        held: &Held<'_>,
        path: &Path,
        candidate: Result<Service>,
        quiet: bool,
    ) -> AddOutcome {
        if let Ok(service) = &candidate
            && self.ledger.service_id(path).as_deref() == Some(service.id.as_str())
        {
            tracing::debug!(path = %path.display(), service_id = %service.id, "already registered");
            return AddOutcome::Unchanged;
        }

        let service = match candidate {
            Ok(service) => service,
            Err(e) => {
                if !quiet {
                    tracing::warn!(path = %path.display(), error = %e, "invalid service definition, ignored");
                }
                return AddOutcome::Invalid;
            }
        };

        // A different ID on record is the previous version of this file.
        if self.ledger.service_id(path).is_some()
            && let RemoveOutcome::Retained(old) = self.remove_locked(held, path).await
        {
            tracing::error!(
                path = %path.display(),
                service_id = %old,
                "previous registration still live, not registering new version"
            );
            return AddOutcome::RegisterFailed;
        }

        if let Err(e) = self.registry.register(&service).await {
            tracing::error!(path = %path.display(), service_id = %service.id, error = %e, "register failed");
            return AddOutcome::RegisterFailed;
        }

        match self.ledger.add(path, &service.id) {
            Ok(_) => {
                tracing::info!(path = %path.display(), service_id = %service.id, "added");
                AddOutcome::Registered(service.id)
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    service_id = %service.id,
                    error = %e,
                    "registered in backend but ledger write failed; backend and ledger disagree until next sync"
                );
                AddOutcome::LedgerWriteFailed(service.id)
            }
        }
    }

    async fn remove_locked(&self, _held: &Held<'_>, path: &Path) -> RemoveOutcome {
        let Some(service_id) = self.ledger.service_id(path) else {
            tracing::debug!(path = %path.display(), "not tracked, nothing to remove");
            return RemoveOutcome::Untracked;
        };

        let outcome = match self.registry.deregister(&Service::with_id(&service_id)).await {
            Ok(()) => RemoveOutcome::Deregistered(service_id),
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), service_id = %service_id, "already gone from backend");
                RemoveOutcome::AlreadyGone(service_id)
            }
            Err(e) => match self.config.deregister_policy {
                DeregisterPolicy::RetainOnError => {
                    tracing::error!(path = %path.display(), service_id = %service_id, error = %e, "deregister failed, keeping ledger entry");
                    return RemoveOutcome::Retained(service_id);
                }
                DeregisterPolicy::AlwaysClear => {
                    tracing::error!(path = %path.display(), service_id = %service_id, error = %e, "deregister failed, clearing ledger entry anyway");
                    RemoveOutcome::ClearedAfterError(service_id)
                }
            },
        };

        match self.ledger.remove(path) {
            Ok(_) => tracing::info!(path = %path.display(), "removed"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "ledger write failed while removing"),
        }
        outcome
    }
}
