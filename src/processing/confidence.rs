//! Confidence classification used for highlighting and export annotations.

use serde::{Deserialize, Serialize};

use super::normalize;
use crate::models::TextFragment;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Below this a span is `Low`.
    pub low: f64,
    /// Below this (and at or above `low`) a span is `Medium`.
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            low: 0.5,
            medium: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl ConfidenceThresholds {
    pub fn level(&self, confidence: f64) -> ConfidenceLevel {
        if confidence < self.low {
            ConfidenceLevel::Low
        } else if confidence < self.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        }
    }

    /// Anything short of `High` is worth a second look in exports.
    pub fn needs_review(&self, confidence: f64) -> bool {
        confidence < self.medium
    }
}

/// `0.734` -> `"73%"`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{}%", (confidence * 100.0).round() as i64)
}

/// A cleaned span of page text with its offsets in the combined text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    pub text: String,
    pub confidence: f64,
    pub level: ConfidenceLevel,
    pub start_index: usize,
    pub end_index: usize,
}

/// Offsets are character positions in the space-joined cleaned text.
pub fn create_text_segments(
    fragments: &[TextFragment],
    thresholds: &ConfidenceThresholds,
) -> Vec<TextSegment> {
    let mut segments = Vec::with_capacity(fragments.len());
    let mut cursor = 0;

    for fragment in fragments {
        let text = normalize(&fragment.text);
        let len = text.chars().count();
        segments.push(TextSegment {
            level: thresholds.level(fragment.confidence),
            confidence: fragment.confidence,
            start_index: cursor,
            end_index: cursor + len,
            text,
        });
        cursor += len + 1;
    }

    segments
}
