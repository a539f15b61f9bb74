//! Atomic snapshot writer
//!
//! Writes go to a sibling temp file which is then renamed over the target.
//! The previous snapshot stays intact until the rename succeeds.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Temp file used while saving `path`
///
/// "data/store.json" → "data/.store.json.tmp"
pub fn temp_path(path: &Path) -> PathBuf {
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("store.json");
    path.with_file_name(format!(".{}.tmp", base))
}

/// Replace `path` with `bytes` atomically
///
/// Steps:
/// 1. Write all bytes to the temp file (fsync if `sync`)
/// 2. Rename the temp file over `path`
/// 3. fsync the directory so the rename itself is durable (best-effort)
///
/// On failure the temp file is removed and `path` is untouched.
pub fn write_atomic(path: &Path, bytes: &[u8], sync: bool) -> Result<()> {
    let tmp_path = temp_path(path);

    if let Err(e) = write_temp(&tmp_path, bytes, sync) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    if sync {
        if let Some(dir) = path.parent() {
            if let Ok(dir_file) = File::open(dir) {
                let _ = dir_file.sync_all();
            }
        }
    }

    Ok(())
}

fn write_temp(tmp_path: &Path, bytes: &[u8], sync: bool) -> Result<()> {
    let mut tmp = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)?;

    tmp.write_all(bytes)?;
    tmp.flush()?;
    if sync {
        tmp.sync_all()?;
    }
    Ok(())
}

/// Remove a temp file left behind by an interrupted save
///
/// Returns true if one was found and removed.
pub fn remove_stale_temp(path: &Path) -> Result<bool> {
    match fs::remove_file(temp_path(path)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
