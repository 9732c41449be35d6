//! Full reconciliation pass, dangling sweep and TTL refresh

use std::path::Path;

use super::{Bridge, Held, SyncReport};
use crate::Result;

impl Bridge {
    /// Reconcile every definition file with the backend.
    ///
    /// Files whose ledger entry is missing or stale go through the add path.
    /// Files whose ledger entry matches are re-registered directly, without
    /// touching the ledger, in case the backend forgot them. With cleanup
    /// enabled, ledger entries for deleted files are removed and dangling
    /// backend entries attributable to this host are deregistered.
    ///
    /// Holds the Bridge critical section for the whole pass.
    ///
    /// # Errors
    ///
    /// Returns an error only if the config directory cannot be enumerated.
    /// Per-file and per-entry failures are logged and counted in the report.
    pub async fn sync(&self, quiet: bool) -> Result<SyncReport> {
        let held = self.gate.lock().await;

        let paths = self.filter.collect(&self.config.config_dir)?;
        tracing::info!(files = paths.len(), "syncing services");

        let mut report = SyncReport {
            files: paths.len(),
            ..SyncReport::default()
        };

        for path in &paths {
            self.sync_file(&held, path, quiet, &mut report).await;
        }

        if self.config.cleanup {
            self.prune_missing(&held, &mut report).await;
            self.sweep_dangling(&held, &mut report).await;
        }

        tracing::debug!(?report, "sync finished");
        Ok(report)
    }

    async fn sync_file(&self, held: &Held<'_>, path: &Path, quiet: bool, report: &mut SyncReport) {
        let candidate = self.new_service_from_file(path);
        let recorded = self.ledger.service_id(path);

        if let Ok(service) = &candidate
            && recorded.as_deref() == Some(service.id.as_str())
        {
            match self.registry.register(service).await {
                Ok(()) => report.reasserted += 1,
                Err(e) => {
                    tracing::error!(path = %path.display(), service_id = %service.id, error = %e, "sync register failed");
                    report.failed += 1;
                }
            }
            return;
        }

        let outcome = self.add_candidate(held, path, candidate, quiet).await;
        report.record_add(&outcome);
    }

    /// Drop ledger entries whose definition file disappeared while no event
    /// was observed.
    async fn prune_missing(&self, held: &Held<'_>, report: &mut SyncReport) {
        for path in self.ledger.paths() {
            if matches!(path.try_exists(), Ok(false)) {
                tracing::info!(path = %path.display(), "definition file vanished");
                self.remove_locked(held, &path).await;
                report.pruned += 1;
            }
        }
    }

    /// Deregister backend entries from this host whose signature the ledger
    /// does not know. Entries from other hosts or with foreign IDs are left
    /// alone.
    async fn sweep_dangling(&self, _held: &Held<'_>, report: &mut SyncReport) {
        let live = match self.registry.services().await {
            Ok(live) => live,
            Err(e) => {
                tracing::error!(error = %e, "cleanup failed, cannot list backend services");
                report.failed += 1;
                return;
            }
        };

        let known = self.ledger.signatures();
        for service in live {
            let Some(id) = service.parsed_id() else {
                continue;
            };
            if !id.belongs_to(&self.config.host_identity) || known.contains(id.signature()) {
                continue;
            }

            tracing::info!(service_id = %service.id, "dangling");
            match self.registry.deregister(&service).await {
                Ok(()) => {
                    tracing::info!(service_id = %service.id, "dangling service removed");
                    report.dangling.push(service.id);
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(service_id = %service.id, "dangling service already gone");
                }
                Err(e) => {
                    tracing::error!(service_id = %service.id, error = %e, "deregister dangling failed");
                    report.failed += 1;
                }
            }
        }
    }

    /// Renew TTLs of every registration whose definition is unchanged.
    ///
    /// A no-op when no TTL is configured; safe to call at any time and any
    /// number of times. Returns how many services were refreshed.
    pub async fn refresh(&self) -> usize {
        if self.config.refresh_ttl == 0 {
            return 0;
        }
        let _held = self.gate.lock().await;

        let mut refreshed = 0;
        for path in self.ledger.paths() {
            let service = match self.new_service_from_file(&path) {
                Ok(service) => service,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping refresh");
                    continue;
                }
            };
            if self.ledger.service_id(&path).as_deref() != Some(service.id.as_str()) {
                continue;
            }
            match self.registry.refresh(&service).await {
                Ok(()) => refreshed += 1,
                Err(e) => {
                    tracing::error!(service_id = %service.id, error = %e, "refresh failed");
                }
            }
        }
        refreshed
    }
}
