//! [`ConfigDir`]: a temporary definition directory.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// JSON body of a minimal definition file.
pub fn definition(name: &str, port: u16) -> String {
    serde_json::json!({
        "name": name,
        "port": port,
        "address": "10.0.0.1",
        "tags": ["test"],
        "attrs": {"owner": "tests"},
    })
    .to_string()
}

/// A temporary directory standing in for the definition config directory.
///
/// The root is canonicalized so paths written here compare equal to the
/// paths a Bridge records in its ledger.
pub struct ConfigDir {
    temp_dir: TempDir,
    root: PathBuf,
}

impl Default for ConfigDir {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigDir {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp_dir.path()).unwrap();
        Self { temp_dir, root }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `name` (relative to the root), creating parents.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a minimal definition for `name` on `port` to `<file>`.
    pub fn write_definition(&self, file: &str, name: &str, port: u16) -> PathBuf {
        self.write(file, &definition(name, port))
    }

    /// Delete `name` (relative to the root).
    pub fn delete(&self, name: &str) {
        fs::remove_file(self.root.join(name)).unwrap();
    }

    /// Keep the underlying `TempDir` alive for the caller's scope.
    pub fn temp_dir(&self) -> &TempDir {
        &self.temp_dir
    }
}
