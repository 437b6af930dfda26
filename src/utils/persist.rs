//! State Persistence Module
//!
//! JSON files written temp-file-then-rename so a crash never leaves a
//! half-written file behind. External readers see either the old state
//! or the new one, never a torn write.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::models::errors::PersistenceError;

/// Serialize `value` and atomically replace `path` with it
pub fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let payload = serde_json::to_string_pretty(value)?;

    let tmp = tmp_path(path);
    fs::write(&tmp, payload.as_bytes())?;
    fs::rename(&tmp, path).map_err(|e| {
        // Leave no temp droppings on a failed rename
        let _ = fs::remove_file(&tmp);
        PersistenceError::with_source(format!("rename to {}", path.display()), e)
    })?;
    Ok(())
}

/// Load a JSON file; `Ok(None)` when it does not exist yet
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let value = serde_json::from_str(&raw)?;
    Ok(Some(value))
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    std::path::PathBuf::from(os)
}
