//! Dealer-supplied data: the local price override file and the CSV feed
//! some dealers publish instead.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::model::StoreError;

/// Numbers in the feed use spaces as thousands separators.
static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+( \d+)*(\.\d+)?$").expect("valid numeric regex"));

/// Load the override file. A missing or unreadable file means "no override
/// available" and is never an error.
pub fn load_overrides(path: &Path) -> Option<HashMap<String, Value>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), "dealer override file not read: {err}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(map) => Some(map),
        Err(err) => {
            warn!(path = %path.display(), "dealer override file not parsed: {err}");
            None
        }
    }
}

/// Convert a CSV feed into an object keyed by `key_column`. All-empty rows
/// are skipped, the key column is excluded from each row object, and
/// numeric-looking values lose their inner spaces and become JSON numbers.
pub fn csv_to_keyed_json(csv_data: &str, key_column: &str) -> Result<Map<String, Value>, StoreError> {
    let mut reader = csv::Reader::from_reader(csv_data.as_bytes());
    let headers = reader.headers()?.clone();
    let key_idx = headers
        .iter()
        .position(|h| h == key_column)
        .ok_or_else(|| StoreError::MissingKeyColumn(key_column.to_string()))?;

    let mut out = Map::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let key = record.get(key_idx).unwrap_or("").trim().to_string();
        let mut row = Map::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == key_idx {
                continue;
            }
            let value = record.get(idx).unwrap_or("").trim();
            row.insert(header.to_string(), coerce_value(value));
        }
        out.insert(key, Value::Object(row));
    }
    Ok(out)
}

fn coerce_value(value: &str) -> Value {
    if !NUMERIC_RE.is_match(value) {
        return Value::String(value.to_string());
    }
    let compact = value.replace(' ', "");
    if compact.contains('.') {
        match compact.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(value.to_string()),
        }
    } else {
        match compact.parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => Value::String(value.to_string()),
        }
    }
}
