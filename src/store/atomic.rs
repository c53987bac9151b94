//! Atomic file replacement
//!
//! Writes to a temp file in the same directory, syncs it, then renames it
//! over the target. Readers see either the old file or the new one.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    // Windows refuses to rename over an existing file
    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        let backup_path = path.with_extension("bak");
        let _ = std::fs::remove_file(&backup_path);
        std::fs::rename(path, &backup_path)?;
        if let Err(e) = err.file.persist(path) {
            std::fs::rename(&backup_path, path)?;
            return Err(e.error);
        }
        let _ = std::fs::remove_file(&backup_path);
    }

    sync_parent_dir(parent);
    Ok(())
}

fn sync_parent_dir(parent: &Path) {
    #[cfg(unix)]
    if let Err(e) = std::fs::File::open(parent).and_then(|d| d.sync_all()) {
        tracing::debug!(
            path = %parent.display(),
            "Parent directory sync failed (best-effort): {e}"
        );
    }
    #[cfg(not(unix))]
    let _ = parent;
}
