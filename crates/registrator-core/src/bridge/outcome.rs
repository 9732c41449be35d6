//! Results of Bridge operations
//!
//! Operations never fail the process; they report what happened so callers
//! (and tests) can tell a no-op from a skipped file from a backend failure.

/// Result of adding one definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Registered in the backend and recorded in the ledger.
    Registered(String),
    /// The ledger already holds this exact ID; the backend was not called.
    Unchanged,
    /// The file could not be read or parsed; the backend was not called.
    Invalid,
    /// The backend refused or failed; the ledger was not written.
    RegisterFailed,
    /// Registered, but the ledger write failed. Backend and ledger disagree
    /// until the next sync.
    LedgerWriteFailed(String),
}

impl AddOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

/// Result of removing one definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// No ledger entry for the path; nothing to do.
    Untracked,
    /// Deregistered and cleared from the ledger.
    Deregistered(String),
    /// The backend no longer knew the ID; cleared from the ledger.
    AlreadyGone(String),
    /// Deregistration failed, entry cleared anyway.
    ClearedAfterError(String),
    /// Deregistration failed, entry kept for a later retry.
    Retained(String),
}

/// Counters from one full reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Definition files found under the config directory.
    pub files: usize,
    /// Files newly registered (ledger written).
    pub added: usize,
    /// Files whose ledger entry matched and were re-registered directly.
    pub reasserted: usize,
    /// Files skipped because they could not be read or parsed.
    pub invalid: usize,
    /// Backend or ledger failures encountered during the pass.
    pub failed: usize,
    /// Ledger entries whose definition file no longer exists.
    pub pruned: usize,
    /// IDs of dangling backend entries that were deregistered.
    pub dangling: Vec<String>,
}

impl SyncReport {
    pub(crate) fn record_add(&mut self, outcome: &AddOutcome) {
        match outcome {
            AddOutcome::Registered(_) => self.added += 1,
            AddOutcome::Unchanged => self.reasserted += 1,
            AddOutcome::Invalid => self.invalid += 1,
            AddOutcome::RegisterFailed | AddOutcome::LedgerWriteFailed(_) => self.failed += 1,
        }
    }
}
