//! Per-file schema rules. Two data files carry business rules the generic
//! editor must honor; they are declared here as data rather than scattered
//! through the save path, and looked up by file name.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::warn;

use super::typed::TypedValue;

/// Declarative rules for one file name.
#[derive(Debug, Default, Clone)]
pub struct FileRules {
    /// The top-level key set and order are fixed: removed keys come back
    /// with an empty value of their original type, added keys are dropped.
    pub preserve_key_set: bool,
    /// Values under these key names are always restored from the original
    /// document, at any depth.
    pub protected_keys: Vec<&'static str>,
    /// `(array_path, key, default)`: every object element of the array at
    /// `array_path` gets `key: default` when missing.
    pub item_defaults: Vec<(&'static str, &'static str, Value)>,
    /// Every element of the root array is rebuilt on this template:
    /// missing keys filled with defaults, keys not in the template
    /// dropped, nested objects normalized recursively.
    pub item_template: Option<Value>,
    /// `(path, allowed, default)`: the string at `path` inside each root
    /// array element must be one of `allowed`, anything else becomes
    /// `default`.
    pub item_choices: Vec<(&'static str, &'static [&'static str], &'static str)>,
    /// The root array is sorted by its elements' numeric `id`, descending.
    pub sort_by_id_desc: bool,
}

pub struct SchemaRules {
    rules: HashMap<&'static str, FileRules>,
}

impl SchemaRules {
    /// The built-in registry mirrors the two historical special cases:
    /// `scripts.json` (fixed key set, untouchable `fn` handlers, metrika
    /// entries default `trackHash: false`) and `banners.json` (banner
    /// object shape, newest first).
    pub fn builtin() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            "scripts.json",
            FileRules {
                preserve_key_set: true,
                protected_keys: vec!["fn"],
                item_defaults: vec![("metrika.value", "trackHash", json!(false))],
                ..FileRules::default()
            },
        );
        rules.insert(
            "banners.json",
            FileRules {
                item_template: Some(banner_template()),
                item_choices: vec![("badge.position", &["left", "center", "right"], "right")],
                sort_by_id_desc: true,
                ..FileRules::default()
            },
        );
        Self { rules }
    }

    /// Apply the rules for `file` to the edited document, consulting the
    /// original where a rule restores prior content. Files without rules
    /// pass through untouched.
    pub fn apply(&self, file: &str, original: &Value, edited: Value) -> Value {
        let Some(rules) = self.rules.get(file) else {
            return edited;
        };
        let mut doc = edited;
        if rules.preserve_key_set {
            doc = preserve_key_set(original, doc);
        }
        for key in &rules.protected_keys {
            restore_protected(&mut doc, original, key);
        }
        for (path, key, default) in &rules.item_defaults {
            default_array_items(&mut doc, path, key, default);
        }
        if let Some(template) = &rules.item_template {
            if let Value::Array(items) = &mut doc {
                for item in items {
                    rebuild_from_template(item, template);
                }
            }
        }
        for (path, allowed, default) in &rules.item_choices {
            if let Value::Array(items) = &mut doc {
                for item in items {
                    clamp_choice(item, path, allowed, default);
                }
            }
        }
        if rules.sort_by_id_desc {
            if let Value::Array(items) = &mut doc {
                items.sort_by_key(|item| {
                    std::cmp::Reverse(item.get("id").and_then(Value::as_i64).unwrap_or(0))
                });
            }
        }
        doc
    }

    /// Same entry point for the typed tree the editor works with.
    pub fn apply_typed(&self, file: &str, original: &TypedValue, edited: &TypedValue) -> TypedValue {
        TypedValue::from_json(&self.apply(file, &original.to_json(), edited.to_json()))
    }
}

fn empty_of_same_type(value: &Value) -> Value {
    match value {
        Value::Object(_) => json!({}),
        Value::Array(_) => json!([]),
        Value::Bool(_) => json!(false),
        Value::Number(_) => json!(0),
        Value::Null => Value::Null,
        Value::String(_) => json!(""),
    }
}

/// Rebuild the edited object on the original's key skeleton.
fn preserve_key_set(original: &Value, edited: Value) -> Value {
    let (Value::Object(orig), Value::Object(mut new)) = (original, edited) else {
        return original.clone();
    };
    let mut out = serde_json::Map::new();
    for (key, orig_val) in orig {
        let value = match new.swap_remove(key) {
            Some(v) => v,
            None => {
                warn!(%key, "removed key restored with an empty value");
                empty_of_same_type(orig_val)
            }
        };
        out.insert(key.clone(), value);
    }
    for dropped in new.keys() {
        warn!(key = %dropped, "added key dropped by schema rule");
    }
    Value::Object(out)
}

/// Restore every value under `key` from the original, walking both trees
/// in parallel.
fn restore_protected(dst: &mut Value, src: &Value, key: &str) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, src_val) in src_map {
                if k == key {
                    dst_map.insert(k.clone(), src_val.clone());
                } else if let Some(dst_val) = dst_map.get_mut(k) {
                    restore_protected(dst_val, src_val, key);
                }
            }
        }
        (Value::Array(dst_items), Value::Array(src_items)) => {
            for (dst_item, src_item) in dst_items.iter_mut().zip(src_items) {
                restore_protected(dst_item, src_item, key);
            }
        }
        _ => {}
    }
}

fn default_array_items(doc: &mut Value, path: &str, key: &str, default: &Value) {
    let mut node = doc;
    for seg in path.split('.') {
        match node.get_mut(seg) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Value::Array(items) = node {
        for item in items {
            if let Value::Object(map) = item {
                if !map.contains_key(key) {
                    map.insert(key.to_string(), default.clone());
                }
            }
        }
    }
}

/// Rebuild the item on the template's key skeleton: template keys keep
/// the edited value, everything else is dropped.
fn rebuild_from_template(item: &mut Value, template: &Value) {
    let Value::Object(tpl) = template else {
        return;
    };
    let mut src = match item.take() {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let mut out = serde_json::Map::new();
    for (key, tpl_val) in tpl {
        let mut value = src.swap_remove(key).unwrap_or_else(|| tpl_val.clone());
        if tpl_val.is_object() {
            rebuild_from_template(&mut value, tpl_val);
        }
        out.insert(key.clone(), value);
    }
    for dropped in src.keys() {
        warn!(key = %dropped, "unknown banner key dropped");
    }
    *item = Value::Object(out);
}

fn clamp_choice(item: &mut Value, path: &str, allowed: &[&str], default: &str) {
    let mut node = item;
    for seg in path.split('.') {
        match node.get_mut(seg) {
            Some(next) => node = next,
            None => return,
        }
    }
    if !node.as_str().is_some_and(|v| allowed.contains(&v)) {
        *node = Value::String(default.to_string());
    }
}

fn banner_template() -> Value {
    let per_device = |v: &str| json!({ "desktop": v, "tablet": v, "mobile": v });
    json!({
        "id": 0,
        "show": false,
        "type": "",
        "view": "link",
        "image": per_device(""),
        "position": per_device("center"),
        "title": "",
        "descr": "",
        "btn": "",
        "btnUrl": "",
        "dataTitle": "",
        "dataFormName": "",
        "badge": {
            "autoname": "",
            "title": "",
            "descr": "",
            "image": "",
            "position": "right",
            "colorText": "",
            "bg": false
        },
        "autoplay": 0,
        "gradient": false,
        "alt": "",
        "video": per_device(""),
        "bannerUrl": "",
        "target": "",
        "btnColor": ""
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_without_rules_pass_through() {
        let rules = SchemaRules::builtin();
        let edited = json!({"anything": 1});
        assert_eq!(
            rules.apply("cars.json", &json!({}), edited.clone()),
            edited
        );
        // the rules are keyed to scripts.json, not settings.json
        assert_eq!(
            rules.apply("settings.json", &json!({}), edited.clone()),
            edited
        );
    }

    #[test]
    fn scripts_key_set_is_fixed() {
        let rules = SchemaRules::builtin();
        let original = json!({"brand": "geely", "phone": "+7", "fn": {"handler": "x"}});
        let edited = json!({"phone": "+8", "injected": true, "fn": {"handler": "hacked"}});
        let out = rules.apply("scripts.json", &original, edited);
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["brand", "phone", "fn"]);
        // removed key restored empty, fn restored from the original
        assert_eq!(out["brand"], json!(""));
        assert_eq!(out["phone"], json!("+8"));
        assert_eq!(out["fn"]["handler"], json!("x"));
    }

    #[test]
    fn scripts_fn_handlers_are_restored_at_depth() {
        let rules = SchemaRules::builtin();
        let original = json!({"widgets": {"fn": "initWidgets", "enabled": true}});
        let edited = json!({"widgets": {"fn": "tampered", "enabled": false}});
        let out = rules.apply("scripts.json", &original, edited);
        assert_eq!(out["widgets"]["fn"], json!("initWidgets"));
        assert_eq!(out["widgets"]["enabled"], json!(false));
    }

    #[test]
    fn metrika_entries_get_track_hash_default() {
        let rules = SchemaRules::builtin();
        let original = json!({"metrika": {"value": [{"id": 1}]}});
        let edited = json!({"metrika": {"value": [{"id": 1}, {"id": 2, "trackHash": true}]}});
        let out = rules.apply("scripts.json", &original, edited);
        assert_eq!(out["metrika"]["value"][0]["trackHash"], json!(false));
        assert_eq!(out["metrika"]["value"][1]["trackHash"], json!(true));
    }

    #[test]
    fn banners_are_normalized_and_sorted() {
        let rules = SchemaRules::builtin();
        let edited = json!([
            {"id": 1, "title": "older", "legacy": true},
            {"id": 3, "title": "newest", "badge": {"title": "hot", "position": "top"}}
        ]);
        let out = rules.apply("banners.json", &json!([]), edited);
        let items = out.as_array().unwrap();
        assert_eq!(items[0]["id"], json!(3));
        assert_eq!(items[0]["view"], json!("link"));
        // known badge fields survive the rebuild, the bad position is clamped
        assert_eq!(items[0]["badge"]["title"], json!("hot"));
        assert_eq!(items[0]["badge"]["position"], json!("right"));
        assert_eq!(items[1]["image"]["desktop"], json!(""));
        // keys outside the template are dropped
        assert!(items[1].get("legacy").is_none());
    }
}
