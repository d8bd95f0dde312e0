//! JSON output. Every run fully overwrites its output files; there is no
//! locking, the editor side keeps backups instead.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::model::StoreError;

/// Written next to `cars.json` so the static site can pick up federal
/// prices under the name it expects.
const COMPANION_COPY: &str = "federal-models_price.json";
/// Stale artifact of an older pipeline, removed when found.
const STALE_COPY: &str = "models-price.json";

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Serialize pretty JSON to every path, creating parent directories.
pub fn save_json<T: Serialize>(data: &T, paths: &[impl AsRef<Path>]) -> Result<(), StoreError> {
    let body = serde_json::to_string_pretty(data)?;
    for path in paths {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        fs::write(path, &body).map_err(|e| io_err(path, e))?;
        info!(path = %path.display(), "data saved");
        write_companion_copy(path, &body)?;
    }
    Ok(())
}

fn write_companion_copy(path: &Path, body: &str) -> Result<(), StoreError> {
    if path.file_name().and_then(|n| n.to_str()) != Some("cars.json") {
        return Ok(());
    }
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stale = dir.join(STALE_COPY);
    match fs::remove_file(&stale) {
        Ok(()) => info!(path = %stale.display(), "stale copy removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(&stale, e)),
    }
    let copy = dir.join(COMPANION_COPY);
    fs::write(&copy, body).map_err(|e| io_err(&copy, e))?;
    info!(path = %copy.display(), "companion copy saved");
    Ok(())
}

/// Read several JSON array files and concatenate them in input order.
pub fn merge_arrays(inputs: &[impl AsRef<Path>]) -> Result<Vec<Value>, StoreError> {
    let mut merged = Vec::new();
    for path in inputs {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let mut items: Vec<Value> = serde_json::from_str(&raw)?;
        merged.append(&mut items);
    }
    Ok(merged)
}
