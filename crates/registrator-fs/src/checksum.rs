//! Content signatures for definition files
//!
//! A signature is the lowercase hex SHA-256 of the raw file bytes. It carries
//! no prefix so it can be embedded directly in a service ID segment.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{Error, Result};

/// Compute the signature of raw definition bytes.
pub fn content_signature(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Read a file and compute the signature of its bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_signature(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(content_signature(&content))
}
