//! Type-tagged JSON tree for the data editor. Every node keeps its
//! original JSON type as the variant tag; edits arrive as plain strings
//! and are cast back to the node's original type, so a hand-edited price
//! stays a number and a flag stays a bool.

use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::model::EditError;

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<TypedValue>),
    /// Key order is preserved; the editor treats it as part of the schema.
    Object(Vec<(String, TypedValue)>),
}

/// One step into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

impl TypedValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => TypedValue::Null,
            Value::Bool(b) => TypedValue::Bool(*b),
            Value::Number(n) => TypedValue::Number(n.clone()),
            Value::String(s) => TypedValue::String(s.clone()),
            Value::Array(items) => {
                TypedValue::Array(items.iter().map(TypedValue::from_json).collect())
            }
            Value::Object(map) => TypedValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), TypedValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Number(n) => Value::Number(n.clone()),
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::Array(items) => Value::Array(items.iter().map(TypedValue::to_json).collect()),
            TypedValue::Object(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
        }
    }

    fn get_mut(&mut self, path: &[PathSeg]) -> Option<&mut TypedValue> {
        let mut node = self;
        for seg in path {
            node = match (node, seg) {
                (TypedValue::Object(entries), PathSeg::Key(key)) => entries
                    .iter_mut()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v)?,
                (TypedValue::Array(items), PathSeg::Index(idx)) => items.get_mut(*idx)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Assign a posted string to the scalar node at `path`, casting to the
    /// node's original type. Container nodes cannot be assigned.
    pub fn set_scalar(&mut self, path: &[PathSeg], raw: &str) -> Result<(), EditError> {
        let node = self
            .get_mut(path)
            .ok_or_else(|| EditError::BadPath(render_path(path)))?;
        match node {
            TypedValue::Array(_) => return Err(EditError::NotScalar("array")),
            TypedValue::Object(_) => return Err(EditError::NotScalar("object")),
            TypedValue::Null => {
                // A null field stays null; the form has no way to give it
                // another type.
                if !raw.is_empty() {
                    warn!(path = %render_path(path), "value for null field discarded");
                }
            }
            TypedValue::Bool(b) => {
                *b = matches!(raw, "1" | "true" | "on");
            }
            TypedValue::Number(_) => {
                *node = cast_number(raw, &render_path(path));
            }
            TypedValue::String(s) => {
                *s = normalize_newlines(raw);
            }
        }
        Ok(())
    }
}

/// Empty input turns a number field into null (cleared); anything
/// unparseable degrades to 0 with a warning.
fn cast_number(raw: &str, path: &str) -> TypedValue {
    if raw.is_empty() {
        return TypedValue::Null;
    }
    if raw.contains('.') || raw.contains('e') || raw.contains('E') {
        match raw.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => return TypedValue::Number(n),
            None => {}
        }
    } else if let Ok(n) = raw.parse::<i64>() {
        return TypedValue::Number(n.into());
    }
    warn!(path, raw, "unparseable number, saved as 0");
    TypedValue::Number(0.into())
}

/// CRLF and bare CR collapse to LF before saving.
pub fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

/// Parse `a.b[2].c` into path segments.
pub fn parse_path(raw: &str) -> Result<Vec<PathSeg>, EditError> {
    let mut segs = Vec::new();
    for part in raw.split('.').filter(|p| !p.is_empty()) {
        let mut rest = part;
        if let Some(at) = rest.find('[') {
            if at > 0 {
                segs.push(PathSeg::Key(rest[..at].to_string()));
            }
            rest = &rest[at..];
            for idx in rest.split('[').filter(|p| !p.is_empty()) {
                let num = idx
                    .strip_suffix(']')
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| EditError::BadPath(raw.to_string()))?;
                segs.push(PathSeg::Index(num));
            }
        } else {
            segs.push(PathSeg::Key(rest.to_string()));
        }
    }
    Ok(segs)
}

pub fn render_path(path: &[PathSeg]) -> String {
    let mut out = String::new();
    for seg in path {
        match seg {
            PathSeg::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            PathSeg::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}
