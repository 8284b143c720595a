//! Printed page-number detection.
//!
//! Rules are tried in priority order. A rule scans the whole frame before the
//! next rule is consulted, so an explicit "Page 12" always beats a bare corner
//! "7" no matter where the two sit on the page.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{PageNumberGuess, TextFragment};

/// Relative vertical band counted as a page corner, from either edge.
const CORNER_BAND: f64 = 0.2;
const BARE_NUMBER_MIN_CONFIDENCE: f64 = 0.7;
const BARE_NUMBER_MAX: u32 = 999;

/// Frame geometry needed by the positional rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameContext {
    /// Frame height in the units of the fragments' bounding boxes. `None`
    /// means coordinates are already normalized to 0-1.
    pub height: Option<f64>,
}

impl FrameContext {
    pub fn with_height(height: Option<f64>) -> Self {
        Self {
            height: height.filter(|h| *h > 0.0),
        }
    }

    pub fn relative_y(&self, fragment: &TextFragment) -> f64 {
        match self.height {
            Some(height) => fragment.y() / height,
            None => fragment.y(),
        }
    }

    pub fn is_in_corner(&self, fragment: &TextFragment) -> bool {
        let y = self.relative_y(fragment);
        y < CORNER_BAND || y > 1.0 - CORNER_BAND
    }
}

pub struct PageNumberRule {
    pub name: &'static str,
    pub extract: fn(&TextFragment, &FrameContext) -> Option<u32>,
}

pub const PAGE_NUMBER_RULES: [PageNumberRule; 3] = [
    PageNumberRule {
        name: "page-label",
        extract: page_label,
    },
    PageNumberRule {
        name: "p-abbreviation",
        extract: p_abbreviation,
    },
    PageNumberRule {
        name: "corner-number",
        extract: corner_number,
    },
];

pub fn detect_page_number(
    fragments: &[TextFragment],
    context: &FrameContext,
) -> Option<PageNumberGuess> {
    PAGE_NUMBER_RULES.iter().find_map(|rule| {
        fragments.iter().find_map(|fragment| {
            (rule.extract)(fragment, context).map(|value| PageNumberGuess {
                value,
                confidence: fragment.confidence,
            })
        })
    })
}

fn page_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)page\s+([0-9]+)").expect("page label regex is valid"))
}

fn p_abbreviation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bp(?:\.\s*|\s+)([0-9]+)").expect("p abbreviation regex is valid")
    })
}

fn first_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<u32>().ok())
        .filter(|value| *value > 0)
}

fn page_label(fragment: &TextFragment, _context: &FrameContext) -> Option<u32> {
    first_number(page_label_re(), &fragment.text)
}

fn p_abbreviation(fragment: &TextFragment, _context: &FrameContext) -> Option<u32> {
    first_number(p_abbreviation_re(), &fragment.text)
}

fn corner_number(fragment: &TextFragment, context: &FrameContext) -> Option<u32> {
    let text = fragment.text.trim();
    if text.is_empty() || !text.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    if fragment.confidence <= BARE_NUMBER_MIN_CONFIDENCE {
        return None;
    }
    let value = text.parse::<u32>().ok()?;
    if !(1..=BARE_NUMBER_MAX).contains(&value) || !context.is_in_corner(fragment) {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn at(text: &str, confidence: f64, y: f64) -> TextFragment {
        TextFragment::new(text, confidence, BoundingBox::new(0.0, y, 10.0, 10.0))
    }

    const PIXELS: FrameContext = FrameContext {
        height: Some(1000.0),
    };

    #[test]
    fn explicit_label_beats_corner_number() {
        let fragments = vec![at("7", 0.95, 20.0), at("Page 12", 0.8, 500.0)];
        let guess = detect_page_number(&fragments, &PIXELS).unwrap();
        assert_eq!(guess.value, 12);
        assert_eq!(guess.confidence, 0.8);
    }

    #[test]
    fn label_is_case_insensitive() {
        let fragments = vec![at("PAGE 41", 0.9, 500.0)];
        assert_eq!(detect_page_number(&fragments, &PIXELS).unwrap().value, 41);
    }

    #[test]
    fn p_abbreviation_forms() {
        for text in ["p. 23", "P.23", "p 23", "see p. 23"] {
            let fragments = vec![at(text, 0.9, 500.0)];
            assert_eq!(
                detect_page_number(&fragments, &PIXELS).map(|g| g.value),
                Some(23),
                "{text}"
            );
        }
        assert_eq!(detect_page_number(&[at("Step 23", 0.9, 500.0)], &PIXELS), None);
    }

    #[test]
    fn corner_number_needs_position_and_confidence() {
        assert_eq!(
            detect_page_number(&[at("42", 0.9, 950.0)], &PIXELS).map(|g| g.value),
            Some(42)
        );
        // Middle of the page.
        assert_eq!(detect_page_number(&[at("42", 0.9, 500.0)], &PIXELS), None);
        // Confidence must be strictly above 0.7.
        assert_eq!(detect_page_number(&[at("42", 0.7, 950.0)], &PIXELS), None);
        // Out of range.
        assert_eq!(detect_page_number(&[at("1000", 0.9, 950.0)], &PIXELS), None);
        assert_eq!(detect_page_number(&[at("0", 0.9, 950.0)], &PIXELS), None);
    }

    #[test]
    fn normalized_coordinates_without_height() {
        let context = FrameContext::default();
        assert_eq!(
            detect_page_number(&[at("5", 0.9, 0.05)], &context).map(|g| g.value),
            Some(5)
        );
        assert_eq!(detect_page_number(&[at("5", 0.9, 0.5)], &context), None);
    }

    #[test]
    fn nothing_found() {
        let fragments = vec![at("Tomato Soup", 0.9, 10.0), at("Serves 4", 0.9, 40.0)];
        assert_eq!(detect_page_number(&fragments, &PIXELS), None);
    }
}
