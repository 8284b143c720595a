//! Recognized text fragments.
//!
//! A fragment is the atomic unit every heuristic in the pipeline consumes:
//! one span of recognized text with its position and the engine's confidence.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in image units (pixels, or 0-1 when the engine reports
/// normalized coordinates).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFragment {
    pub text: String,
    /// Recognition confidence, 0.0 - 1.0.
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_index: Option<u32>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, confidence: f64, bounding_box: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box,
            block_index: None,
            line_index: None,
            element_index: None,
        }
    }

    pub fn with_indices(mut self, block: u32, line: u32, element: u32) -> Self {
        self.block_index = Some(block);
        self.line_index = Some(line);
        self.element_index = Some(element);
        self
    }

    pub fn y(&self) -> f64 {
        self.bounding_box.y
    }

    pub fn x(&self) -> f64 {
        self.bounding_box.x
    }

    /// Length in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
