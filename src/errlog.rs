//! Append-only plain-text error log kept alongside the console output, so
//! failed CI runs leave a trace in the repository workspace.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::warn;

pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one timestamped line. Logging failures are reported to the
    /// console only; they never fail the run.
    pub fn append(&self, message: &str) {
        let line = format!("{}: {message}\n", Utc::now().to_rfc3339());
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = result {
            warn!(path = %self.path.display(), "error log append failed: {err}");
        }
    }
}
