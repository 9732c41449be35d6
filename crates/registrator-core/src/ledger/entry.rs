use serde::{Deserialize, Serialize};

/// What the ledger remembers about one definition file.
///
/// Entries are replaced wholesale so the ID and the signature it was
/// derived from always stay paired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "service_id")]
    pub service_id: String,
    #[serde(rename = "service_signature")]
    pub signature: String,
}
