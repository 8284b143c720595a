use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::detection::DEFAULT_PAGE_TURN_THRESHOLD;
use crate::export::ExportFormat;
use crate::processing::ConfidenceThresholds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// How often the capture loop grabs a frame.
    pub interval_ms: u64,
    /// Minimum gap between two processed frames.
    pub processing_interval_ms: u64,
    pub recognition_timeout_ms: u64,
    pub page_turn_threshold: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            processing_interval_ms: 2000,
            recognition_timeout_ms: 10_000,
            page_turn_threshold: DEFAULT_PAGE_TURN_THRESHOLD,
        }
    }
}

impl CaptureSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn processing_interval(&self) -> Duration {
        Duration::from_millis(self.processing_interval_ms)
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_millis(self.recognition_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub confidence_thresholds: ConfidenceThresholds,
    pub auto_save_enabled: bool,
    pub export_format: ExportFormat,
    pub keep_page_images: bool,
    pub capture: CaptureSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            confidence_thresholds: ConfidenceThresholds::default(),
            auto_save_enabled: true,
            export_format: ExportFormat::Markdown,
            keep_page_images: true,
            capture: CaptureSettings::default(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Missing or unparseable files fall back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Defaults only, never written anywhere.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::new(),
            data: RwLock::new(UserSettings::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn capture(&self) -> CaptureSettings {
        self.read().capture.clone()
    }

    pub fn thresholds(&self) -> ConfidenceThresholds {
        self.read().confidence_thresholds
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn update_capture(&self, capture: CaptureSettings) -> Result<()> {
        let mut guard = self.write();
        guard.capture = capture;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }
}
