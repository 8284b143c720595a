pub mod confidence;
pub mod merge;
pub mod normalize;

pub use confidence::{
    create_text_segments, format_confidence, ConfidenceLevel, ConfidenceThresholds, TextSegment,
};
pub use merge::merge_fragments;
pub use normalize::normalize;

use crate::models::TextFragment;

/// Mean fragment confidence, 0 for an empty list.
pub fn average_confidence(fragments: &[TextFragment]) -> f64 {
    if fragments.is_empty() {
        return 0.0;
    }
    let sum: f64 = fragments.iter().map(|fragment| fragment.confidence).sum();
    sum / fragments.len() as f64
}

/// Normalized fragment texts joined with single spaces.
pub fn combine_text(fragments: &[TextFragment]) -> String {
    fragments
        .iter()
        .map(|fragment| normalize(&fragment.text))
        .collect::<Vec<_>>()
        .join(" ")
}
