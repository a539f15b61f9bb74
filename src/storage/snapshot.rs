//! Snapshot format
//!
//! A snapshot is the whole key space as one JSON object, keys sorted.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, StoreError};
use crate::value::Value;

/// Full key → value mapping, in key order
pub type Snapshot = BTreeMap<String, Value>;

/// Load a snapshot file
///
/// Returns:
/// - `Ok(None)`: file does not exist
/// - `Ok(Some(snapshot))`: parsed
/// - `Err(StoreError::Corrupt)`: exists but is empty, truncated or malformed
pub fn load(path: &Path) -> Result<Option<Snapshot>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(corrupt(path, format!("not valid UTF-8: {}", e)));
        }
        Err(e) => return Err(e.into()),
    };

    decode(&contents)
        .map(Some)
        .map_err(|reason| corrupt(path, reason))
}

/// Parse snapshot text; the error is a human-readable reason
pub fn decode(contents: &str) -> std::result::Result<Snapshot, String> {
    if contents.trim().is_empty() {
        return Err("file is empty".to_string());
    }

    let snapshot: Snapshot = serde_json::from_str(contents).map_err(|e| e.to_string())?;

    if snapshot.contains_key("") {
        return Err("contains an empty key".to_string());
    }
    if let Some((key, _)) = snapshot
        .iter()
        .find(|(_, v)| matches!(v, Value::Number(n) if !n.is_finite()))
    {
        return Err(format!("non-finite number at '{}'", key));
    }

    Ok(snapshot)
}

/// Serialize a snapshot to bytes (trailing newline included)
pub fn encode(snapshot: &Snapshot, pretty: bool) -> Result<Vec<u8>> {
    let mut bytes = if pretty {
        serde_json::to_vec_pretty(snapshot)?
    } else {
        serde_json::to_vec(snapshot)?
    };
    bytes.push(b'\n');
    Ok(bytes)
}

/// Move an unreadable snapshot out of the way
///
/// "data/store.json" → "data/store.json.corrupt-1700000000"
pub fn quarantine(path: &Path) -> Result<PathBuf> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{}", secs));
    let target = path.with_file_name(name);

    fs::rename(path, &target)?;
    Ok(target)
}

fn corrupt(path: &Path, reason: String) -> StoreError {
    StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    }
}
