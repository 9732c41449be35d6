//! Definition-file discovery
//!
//! The same filter decides which files a sync pass enumerates and which
//! change notifications are acted upon.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Extension that marks a service definition file.
pub const DEFINITION_EXTENSION: &str = "json";

/// Selects definition files by extension, skipping reserved paths.
#[derive(Debug, Clone)]
pub struct DefinitionFilter {
    extension: String,
    reserved: Vec<PathBuf>,
}

impl Default for DefinitionFilter {
    fn default() -> Self {
        Self::new(DEFINITION_EXTENSION)
    }
}

impl DefinitionFilter {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            reserved: Vec::new(),
        }
    }

    /// Exclude one exact path, such as the ledger's backing file. A file
    /// with the same name elsewhere in the tree is still a definition.
    pub fn reserve(mut self, path: impl Into<PathBuf>) -> Self {
        self.reserved.push(path.into());
        self
    }

    /// Whether `path` names a definition file.
    pub fn matches(&self, path: &Path) -> bool {
        if self.reserved.iter().any(|r| r == path) {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.extension)
    }

    /// Recursively list every definition file under `root`, sorted.
    ///
    /// A `root` that is itself a matching file yields just that file.
    ///
    /// Entries below `root` that cannot be read (dangling symlinks,
    /// unreadable subdirectories, link loops) are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` itself does not exist or cannot be read.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let meta = std::fs::metadata(root).map_err(|e| Error::io(root, e))?;
        if !meta.is_dir() {
            return Ok(if self.matches(root) {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::Walk {
                        path: root.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        tracing::debug!(root = %root.display(), count = files.len(), "collected definition files");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/etc/registrator/web.json", true)]
    #[case("/etc/registrator/nested/db.json", true)]
    #[case("/etc/registrator/storage.json", false)]
    #[case("/etc/registrator/.web.json.swp", false)]
    #[case("/etc/registrator/.storage.json.42.tmp", false)]
    #[case("/etc/registrator/nested/storage.json", true)]
    #[case("/etc/registrator/web.JSON", false)]
    #[case("/etc/registrator/README", false)]
    fn filter_matches(#[case] path: &str, #[case] expected: bool) {
        let filter = DefinitionFilter::default().reserve("/etc/registrator/storage.json");
        assert_eq!(filter.matches(Path::new(path)), expected);
    }
}
