//! Identity ledger
//!
//! The ledger maps each definition-file path to the registration this
//! process believes is live in the backend. It is the durable idempotency
//! record: entry present means "registered", and it survives restarts.
//!
//! Every mutation rewrites the whole document under the ledger lock and
//! returns only after the file is on disk.

mod entry;

pub use entry::LedgerEntry;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Error, Result};
use registrator_fs::{file_signature, io};

/// Reserved name of the ledger's backing file inside the config directory.
pub const LEDGER_FILE_NAME: &str = "storage.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    metadata: BTreeMap<PathBuf, LedgerEntry>,
}

/// File-backed path → registration mapping.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    document: Mutex<LedgerDocument>,
}

impl Ledger {
    /// Load the ledger stored in `config_dir`, or start empty on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed;
    /// the previous state cannot be guessed in that case.
    pub fn open(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(LEDGER_FILE_NAME);
        let document = match io::read_bytes(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| Error::LedgerCorrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), "no ledger yet, starting empty");
                LedgerDocument::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that `definition` is registered as `service_id`.
    ///
    /// The signature is computed from the file as it is on disk now. The
    /// entry replaces any previous one for the same path and the ledger is
    /// flushed before returning.
    pub fn add(&self, definition: &Path, service_id: &str) -> Result<LedgerEntry> {
        let entry = LedgerEntry {
            service_id: service_id.to_string(),
            signature: file_signature(definition)?,
        };

        let mut document = self.lock();
        document
            .metadata
            .insert(definition.to_path_buf(), entry.clone());
        self.flush(&document)?;
        Ok(entry)
    }

    /// Forget `definition`. Absent paths are a no-op.
    ///
    /// Returns the removed entry, if any.
    pub fn remove(&self, definition: &Path) -> Result<Option<LedgerEntry>> {
        let mut document = self.lock();
        let removed = document.metadata.remove(definition);
        if removed.is_some() {
            self.flush(&document)?;
        }
        Ok(removed)
    }

    /// The service ID recorded for `definition`.
    pub fn service_id(&self, definition: &Path) -> Option<String> {
        self.lock()
            .metadata
            .get(definition)
            .map(|e| e.service_id.clone())
    }

    /// The full entry recorded for `definition`.
    pub fn entry(&self, definition: &Path) -> Option<LedgerEntry> {
        self.lock().metadata.get(definition).cloned()
    }

    /// Snapshot of every entry.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.lock().metadata.values().cloned().collect()
    }

    /// Snapshot of every tracked definition path (sorted).
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().metadata.keys().cloned().collect()
    }

    /// Signatures currently believed to be live in the backend.
    pub fn signatures(&self) -> HashSet<String> {
        self.lock()
            .metadata
            .values()
            .map(|e| e.signature.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LedgerDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self, document: &LedgerDocument) -> Result<()> {
        let content = serde_json::to_vec_pretty(document)?;
        io::write_atomic(&self.path, &content)?;
        Ok(())
    }
}
