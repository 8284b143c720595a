use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const SCANS_DIR: &str = "scans";
const IMAGES_DIR: &str = "images";

/// Page images on disk, laid out as `<root>/scans/<scan id>/images/<page id>.<ext>`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn scan_dir(&self, scan_id: &str) -> PathBuf {
        self.root.join(SCANS_DIR).join(scan_id)
    }

    /// Copy a captured frame next to its scan and return the stored path.
    pub fn save_page_image(&self, scan_id: &str, page_id: &str, source: &Path) -> Result<PathBuf> {
        let dir = self.scan_dir(scan_id).join(IMAGES_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create image directory {}", dir.display()))?;

        let ext = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");
        let target = dir.join(format!("{page_id}.{ext}"));
        fs::copy(source, &target).with_context(|| {
            format!("failed to copy {} to {}", source.display(), target.display())
        })?;
        Ok(target)
    }

    /// Remove everything stored for a scan. Missing directories are fine.
    pub fn delete_scan_images(&self, scan_id: &str) -> Result<()> {
        let dir = self.scan_dir(scan_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", dir.display()))
            }
        }
    }
}
