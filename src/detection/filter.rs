use crate::models::TextFragment;

const MIN_CONFIDENCE: f64 = 0.3;
const SHORT_TEXT_CHARS: usize = 2;
const SHORT_TEXT_MIN_CONFIDENCE: f64 = 0.5;

/// Drop recognition noise before page detection.
pub fn filter_meaningful(fragments: &[TextFragment]) -> Vec<TextFragment> {
    fragments
        .iter()
        .filter(|fragment| is_meaningful(fragment))
        .cloned()
        .collect()
}

pub fn is_meaningful(fragment: &TextFragment) -> bool {
    if fragment.confidence < MIN_CONFIDENCE {
        return false;
    }
    !(fragment.char_len() < SHORT_TEXT_CHARS && fragment.confidence < SHORT_TEXT_MIN_CONFIDENCE)
}
