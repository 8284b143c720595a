use crate::models::TextFragment;

/// Normalized Levenshtein similarity of two fragment lists, in [0, 1].
///
/// Each list is space-joined and lowercased before comparison. Two empty
/// lists are identical; one empty list against a non-empty one scores 0.
pub fn similarity(current: &[TextFragment], previous: &[TextFragment]) -> f64 {
    match (current.is_empty(), previous.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let current_text = joined_lowercase(current);
    let previous_text = joined_lowercase(previous);

    let max_len = current_text
        .chars()
        .count()
        .max(previous_text.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = strsim::levenshtein(&current_text, &previous_text);
    1.0 - distance as f64 / max_len as f64
}

fn joined_lowercase(fragments: &[TextFragment]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
