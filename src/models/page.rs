use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Recipe, TextFragment};
use crate::processing::{average_confidence, combine_text};

/// A page number read off the page itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNumberGuess {
    pub value: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub scan_id: String,
    /// 1-based; sequential unless a printed page number overrides it.
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub raw_text: String,
    pub processed_text: String,
    pub ocr_results: Vec<TextFragment>,
    pub recipes: Vec<Recipe>,
    pub timestamp: DateTime<Utc>,
    pub average_confidence: f64,
}

impl Page {
    pub fn new(scan_id: &str, page_number: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scan_id: scan_id.to_string(),
            page_number,
            image_path: None,
            raw_text: String::new(),
            processed_text: String::new(),
            ocr_results: Vec::new(),
            recipes: Vec::new(),
            timestamp,
            average_confidence: 0.0,
        }
    }

    /// Replace the page's recognized content and recompute the derived text
    /// and confidence fields.
    pub fn set_fragments(&mut self, fragments: Vec<TextFragment>) {
        self.raw_text = fragments
            .iter()
            .map(|fragment| fragment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.processed_text = combine_text(&fragments);
        self.average_confidence = average_confidence(&fragments);
        self.ocr_results = fragments;
    }

    pub fn has_content(&self) -> bool {
        !self.ocr_results.is_empty()
    }
}
