//! Text recognition seam.
//!
//! Recognition itself is an external capability. The session only sees the
//! `TextRecognizer` trait, which is called from a blocking worker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TextFragment;

pub mod fixture;

pub use fixture::FixtureRecognizer;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("unreadable frame {path}: {reason}")]
    UnreadableFrame { path: PathBuf, reason: String },

    #[error("recognition engine failed: {0}")]
    Engine(String),

    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),

    #[error("recognition worker failed: {0}")]
    Worker(String),
}

/// Everything recognition produced for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedFrame {
    /// Frame size in bounding-box units. Absent when boxes are normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub fragments: Vec<TextFragment>,
}

impl RecognizedFrame {
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self {
            width: None,
            height: None,
            fragments,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.text.trim().is_empty())
    }
}

pub trait TextRecognizer: Send + Sync {
    /// Recognize text in the image at `frame`. May block for a long time.
    fn recognize(&self, frame: &Path) -> Result<RecognizedFrame, RecognitionError>;
}
