//! Line classifiers shared by the recipe parser.

use std::sync::OnceLock;

use regex::Regex;

/// Checked in this order; the first keyword contained in a line names it.
pub const TECHNIQUE_KEYWORDS: [&str; 7] = [
    "technique",
    "method",
    "tip",
    "note",
    "chef's note",
    "cooking tip",
    "pro tip",
];

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("recipe rule regex is valid"))
        }
    };
}

cached_regex!(
    section_header_re,
    r"(?i)^(ingredients?|instructions?|directions?|method|preparation|serves?|yield|time|notes?)"
);
cached_regex!(ingredients_header_re, r"(?i)^ingredients?");
cached_regex!(
    instructions_header_re,
    r"(?i)^(instructions?|directions?|method|preparation)"
);
cached_regex!(list_marker_re, r"^[-•*0-9.)\s]+");
cached_regex!(numbered_step_re, r"^([0-9]+)\.\s*(.+)$");
cached_regex!(recipe_page_number_re, r"(?i)^p\.?\s*([0-9]+)$|^([0-9]+)$");

pub fn is_section_header(text: &str) -> bool {
    section_header_re().is_match(text.trim())
}

pub fn is_ingredients_header(text: &str) -> bool {
    ingredients_header_re().is_match(text.trim())
}

pub fn is_instructions_header(text: &str) -> bool {
    instructions_header_re().is_match(text.trim())
}

/// One to three digits and nothing else.
pub fn is_bare_page_number(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.len() <= 3 && text.chars().all(|ch| ch.is_ascii_digit())
}

/// Starts with a bullet, digit, list punctuation or whitespace.
pub fn is_bulleted_item(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|ch| matches!(ch, '-' | '•' | '*' | '.' | ')') || ch.is_ascii_digit() || ch.is_whitespace())
}

/// Strip leading bullets and list numbering.
pub fn strip_list_marker(text: &str) -> String {
    list_marker_re().replace(text, "").trim().to_string()
}

/// `"3. Bake"` -> `(3, "Bake")`.
pub fn numbered_step(text: &str) -> Option<(u32, String)> {
    let caps = numbered_step_re().captures(text)?;
    let number = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let body = caps.get(2)?.as_str().trim().to_string();
    Some((number, body))
}

/// `"p. 42"`, `"p42"` or `"42"`, valid below 1000.
pub fn recipe_page_number(text: &str) -> Option<u32> {
    let caps = recipe_page_number_re().captures(text.trim())?;
    let digits = caps.get(1).or_else(|| caps.get(2))?;
    digits
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|value| (1..1000).contains(value))
}

pub fn technique_keyword(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    TECHNIQUE_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_headers() {
        for header in ["Ingredients", "INGREDIENT LIST", "Serves 4", "Notes:", "Method", "Time: 30 min"] {
            assert!(is_section_header(header), "{header}");
        }
        assert!(!is_section_header("Tomato Soup"));
        assert!(is_ingredients_header("  ingredients:"));
        assert!(is_instructions_header("Directions"));
        assert!(is_instructions_header("Preparation"));
        assert!(!is_instructions_header("Ingredients"));
    }

    #[test]
    fn list_markers() {
        assert_eq!(strip_list_marker("- 2 tomatoes"), "tomatoes");
        assert_eq!(strip_list_marker("• salt"), "salt");
        assert_eq!(strip_list_marker("3) onions"), "onions");
        assert!(is_bulleted_item("* pepper"));
        assert!(is_bulleted_item("2 eggs"));
        assert!(!is_bulleted_item("Salt"));
    }

    #[test]
    fn numbered_steps() {
        assert_eq!(numbered_step("1. Chop tomatoes"), Some((1, "Chop tomatoes".into())));
        assert_eq!(numbered_step("12.Simmer"), Some((12, "Simmer".into())));
        assert_eq!(numbered_step("Chop tomatoes"), None);
        assert_eq!(numbered_step("1."), None);
    }

    #[test]
    fn page_numbers() {
        assert_eq!(recipe_page_number("p. 42"), Some(42));
        assert_eq!(recipe_page_number("P42"), Some(42));
        assert_eq!(recipe_page_number(" 7 "), Some(7));
        assert_eq!(recipe_page_number("0"), None);
        assert_eq!(recipe_page_number("1000"), None);
        assert_eq!(recipe_page_number("page 4"), None);
        assert!(is_bare_page_number("12"));
        assert!(!is_bare_page_number("1234"));
    }

    #[test]
    fn technique_keywords_in_order() {
        assert_eq!(technique_keyword("Chef's note: rest the dough"), Some("note"));
        assert_eq!(technique_keyword("Pro tip: salt early"), Some("tip"));
        assert_eq!(technique_keyword("Braising technique"), Some("technique"));
        assert_eq!(technique_keyword("Stir well"), None);
    }
}
