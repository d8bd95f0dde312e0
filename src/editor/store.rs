//! Filesystem side of the data editor: site/file discovery under
//! `root/<site>/<data_dir>/*.json`, loading into the typed tree, and
//! saving with a timestamped backup of the previous version.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;
use tracing::info;

use super::typed::TypedValue;
use crate::config::EditorConfig;
use crate::model::EditError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEntry {
    pub site: String,
    pub files: Vec<String>,
}

pub struct DataStore {
    root: PathBuf,
    data_dir: String,
    readonly_files: Vec<String>,
}

fn io_err(path: &Path, source: std::io::Error) -> EditError {
    EditError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Site and file names come from URLs/arguments; anything that could
/// escape the data directory is rejected outright.
fn check_name(name: &str) -> Result<(), EditError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');
    if ok {
        Ok(())
    } else {
        Err(EditError::InvalidName(name.to_string()))
    }
}

impl DataStore {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            root: config.root.clone(),
            data_dir: config.data_dir.clone(),
            readonly_files: config.readonly_files.clone(),
        }
    }

    pub fn is_readonly(&self, file: &str) -> bool {
        self.readonly_files.iter().any(|f| f == file)
    }

    /// List every site directory holding a data dir, with its JSON files.
    /// Backup files are not listed.
    pub fn scan(&self) -> Result<Vec<SiteEntry>, EditError> {
        let mut sites = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| io_err(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let data_path = entry.path().join(&self.data_dir);
            if !data_path.is_dir() {
                continue;
            }
            let Some(site) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            let mut files = Vec::new();
            for file in fs::read_dir(&data_path).map_err(|e| io_err(&data_path, e))? {
                let file = file.map_err(|e| io_err(&data_path, e))?;
                let name = file.file_name();
                let Some(name) = name.to_str() else { continue };
                if name.ends_with(".json") && !name.contains(".bak.") {
                    files.push(name.to_string());
                }
            }
            if !files.is_empty() {
                files.sort();
                sites.push(SiteEntry { site, files });
            }
        }
        sites.sort_by(|a, b| a.site.cmp(&b.site));
        Ok(sites)
    }

    fn data_file_path(&self, site: &str, file: &str) -> Result<PathBuf, EditError> {
        check_name(site)?;
        check_name(file)?;
        if !file.ends_with(".json") {
            return Err(EditError::InvalidName(file.to_string()));
        }
        Ok(self.root.join(site).join(&self.data_dir).join(file))
    }

    pub fn load(&self, site: &str, file: &str) -> Result<TypedValue, EditError> {
        let path = self.data_file_path(site, file)?;
        let raw = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EditError::NotFound(path.display().to_string())
            } else {
                io_err(&path, e)
            }
        })?;
        let value: Value = serde_json::from_str(&raw)?;
        Ok(TypedValue::from_json(&value))
    }

    /// Back up the current content as `<file>.bak.YYYYMMDDHHMMSS`, then
    /// overwrite with the new document. Returns the backup path.
    pub fn save(&self, site: &str, file: &str, doc: &TypedValue) -> Result<PathBuf, EditError> {
        if self.is_readonly(file) {
            return Err(EditError::ReadOnly(file.to_string()));
        }
        let path = self.data_file_path(site, file)?;
        let previous = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EditError::NotFound(path.display().to_string())
            } else {
                io_err(&path, e)
            }
        })?;

        let backup = path.with_file_name(format!(
            "{file}.bak.{}",
            Local::now().format("%Y%m%d%H%M%S")
        ));
        fs::write(&backup, previous).map_err(|e| io_err(&backup, e))?;

        let body = serde_json::to_string_pretty(&doc.to_json())?;
        fs::write(&path, body).map_err(|e| io_err(&path, e))?;
        info!(path = %path.display(), backup = %backup.display(), "file saved with backup");
        Ok(backup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::typed::parse_path;
    use serde_json::json;

    fn store(name: &str) -> (DataStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("dataedit-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let data = root.join("geely.example").join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(
            data.join("settings.json"),
            r#"{"brand": "geely", "phone": "+7 000"}"#,
        )
        .unwrap();
        fs::write(data.join("cars.json"), "[]").unwrap();
        let config = EditorConfig {
            root: root.clone(),
            data_dir: "data".into(),
            readonly_files: vec!["cars.json".into()],
        };
        (DataStore::new(&config), root)
    }

    #[test]
    fn scan_lists_sites_and_json_files() {
        let (store, _root) = store("scan");
        let sites = store.scan().unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].site, "geely.example");
        assert_eq!(sites[0].files, ["cars.json", "settings.json"]);
    }

    #[test]
    fn save_writes_backup_before_overwrite() {
        let (store, root) = store("backup");
        let mut doc = store.load("geely.example", "settings.json").unwrap();
        doc.set_scalar(&parse_path("phone").unwrap(), "+7 111").unwrap();
        let backup = store.save("geely.example", "settings.json", &doc).unwrap();

        let backup_name = backup.file_name().unwrap().to_str().unwrap().to_string();
        assert!(backup_name.starts_with("settings.json.bak."));
        let saved: Value = serde_json::from_str(
            &fs::read_to_string(root.join("geely.example/data/settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["phone"], json!("+7 111"));
        let old: Value = serde_json::from_str(&fs::read_to_string(&backup).unwrap()).unwrap();
        assert_eq!(old["phone"], json!("+7 000"));
    }

    #[test]
    fn readonly_files_refuse_save() {
        let (store, _root) = store("readonly");
        let doc = store.load("geely.example", "cars.json").unwrap();
        assert!(matches!(
            store.save("geely.example", "cars.json", &doc),
            Err(EditError::ReadOnly(_))
        ));
    }

    #[test]
    fn traversal_names_are_rejected() {
        let (store, _root) = store("names");
        assert!(matches!(
            store.load("../etc", "settings.json"),
            Err(EditError::InvalidName(_))
        ));
        assert!(matches!(
            store.load(".", "settings.json"),
            Err(EditError::InvalidName(_))
        ));
        assert!(matches!(
            store.load("geely.example", "no-extension"),
            Err(EditError::InvalidName(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let (store, _root) = store("missing");
        assert!(matches!(
            store.load("geely.example", "absent.json"),
            Err(EditError::NotFound(_))
        ));
    }
}
