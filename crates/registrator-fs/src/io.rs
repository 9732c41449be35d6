//! Atomic I/O operations with file locking

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Write content atomically to a file with locking.
///
/// Writers of the same target are serialized through an exclusive lock on
/// a sibling `.{name}.lock` file, held from before the temp file is
/// created until after the rename. Readers never observe a partial file.
/// Neither sibling carries the definition-file extension.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let _guard = WriteLock::acquire(path)?;

    let temp_path = sibling(path, &format!("{}.tmp", std::process::id()));
    let mut temp_file = File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(path, e));
    }
    Ok(())
}

/// Read a file fully.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// `.{name}.{suffix}` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{suffix}"))
}

/// Exclusive lock on the sibling lock file, released on drop.
struct WriteLock {
    file: File,
}

impl WriteLock {
    fn acquire(target: &Path) -> Result<Self> {
        let lock_path = sibling(target, "lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, e))?;
        file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: target.to_path_buf(),
        })?;
        Ok(Self { file })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
