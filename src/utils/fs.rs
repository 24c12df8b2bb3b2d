//! Atomic file replacement.
//!
//! Readers of the manifest, the handoff file and the rebuild cache must never
//! observe a half-written file, so every write goes to a scratch file in the
//! target's directory and is renamed over the target.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write `contents` to `path` atomically, creating parent directories.
///
/// The scratch file is named `.humpty-*.tmp` so the watcher ignores it.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut scratch = tempfile::Builder::new()
        .prefix(".humpty-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    scratch.write_all(contents)?;
    scratch.as_file().sync_all()?;
    scratch.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
