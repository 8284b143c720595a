use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::markdown::render_markdown;
use crate::models::Scan;
use crate::utils::validation::sanitize_filename;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize scan: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sharing is not available on this device")]
    SharingUnavailable,

    #[error("failed to share {path}: {reason}")]
    Share { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }
}

/// Hands a finished export to something outside the app.
pub trait ShareTarget: Send + Sync {
    fn share(&self, path: &Path) -> Result<(), ExportError>;
}

/// No sharing capability on this host.
pub struct UnavailableShareTarget;

impl ShareTarget for UnavailableShareTarget {
    fn share(&self, _path: &Path) -> Result<(), ExportError> {
        Err(ExportError::SharingUnavailable)
    }
}

/// Copies exports into another directory.
pub struct DirectoryShareTarget {
    dir: PathBuf,
}

impl DirectoryShareTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ShareTarget for DirectoryShareTarget {
    fn share(&self, path: &Path) -> Result<(), ExportError> {
        let share_err = |reason: String| ExportError::Share {
            path: path.to_path_buf(),
            reason,
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| share_err("export path has no file name".to_string()))?;
        fs::create_dir_all(&self.dir).map_err(|err| share_err(err.to_string()))?;
        fs::copy(path, self.dir.join(file_name)).map_err(|err| share_err(err.to_string()))?;
        Ok(())
    }
}

/// Writes scan exports into one directory.
pub struct Exporter {
    exports_dir: PathBuf,
}

impl Exporter {
    pub fn new(exports_dir: impl Into<PathBuf>) -> Self {
        Self {
            exports_dir: exports_dir.into(),
        }
    }

    pub fn exports_dir(&self) -> &Path {
        &self.exports_dir
    }

    pub fn export(&self, scan: &Scan, format: ExportFormat) -> Result<PathBuf, ExportError> {
        self.export_at(scan, format, Utc::now())
    }

    /// Write `<sanitized name>_<unix ms>.<ext>` and return its path.
    pub fn export_at(
        &self,
        scan: &Scan,
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, ExportError> {
        let contents = match format {
            ExportFormat::Markdown => render_markdown(scan),
            ExportFormat::Json => serde_json::to_string_pretty(scan)?,
        };

        let mut stem = sanitize_filename(&scan.name);
        if stem.is_empty() {
            stem = "scan".to_string();
        }
        let path = self.exports_dir.join(format!(
            "{stem}_{}.{}",
            now.timestamp_millis(),
            format.extension()
        ));

        let write_err = |source: io::Error| ExportError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.exports_dir).map_err(write_err)?;
        fs::write(&path, contents).map_err(write_err)?;

        Ok(path)
    }

    pub fn export_and_share(
        &self,
        scan: &Scan,
        format: ExportFormat,
        target: &dyn ShareTarget,
    ) -> Result<PathBuf, ExportError> {
        let path = self.export(scan, format)?;
        target.share(&path)?;
        Ok(path)
    }

    /// Exported files, oldest name first. A missing directory means none.
    pub fn list_exports(&self) -> Result<Vec<PathBuf>, ExportError> {
        let entries = match fs::read_dir(&self.exports_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ExportError::Write {
                    path: self.exports_dir.clone(),
                    source,
                })
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "md" || ext == "json")
            })
            .collect();
        files.sort();
        Ok(files)
    }
}
