//! Disk I/O and file lifecycle for downloaded images.
//!
//! Bytes are written to a `.part` temp file, synced, then renamed onto the
//! final name, so a reader never sees a half-written image under its real
//! name and an interrupted write leaves nothing behind.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `cat.png` → `cat.png.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writes `data` to `final_path` via a temp file and rename.
///
/// On any failure the temp file is removed and `final_path` is untouched.
pub fn write_atomic(final_path: &Path, data: &[u8]) -> Result<()> {
    let tp = temp_path(final_path);
    let result = write_and_finalize(&tp, final_path, data);
    if result.is_err() {
        discard(&tp);
    }
    result
}

fn write_and_finalize(temp: &Path, final_path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp)
        .with_context(|| format!("failed to create temp file: {}", temp.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed to write {}", temp.display()))?;
    file.sync_all().context("storage sync failed")?;
    drop(file);

    std::fs::rename(temp, final_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp.display(),
            final_path.display()
        )
    })?;
    Ok(())
}

/// Removes a partial file if present. Errors are logged, not returned.
pub fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("could not remove partial file {}: {}", path.display(), e),
    }
}
