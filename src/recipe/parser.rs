//! Rule-based recipe structure parser.
//!
//! Works on one page's fragments at a time. Only the title decides whether a
//! recipe exists; every other section may come back empty.

use uuid::Uuid;

use super::ingredient::parse_ingredient_line;
use super::rules::{
    is_bare_page_number, is_bulleted_item, is_ingredients_header, is_instructions_header,
    is_section_header, numbered_step, recipe_page_number, strip_list_marker, technique_keyword,
};
use crate::models::{Ingredient, Instruction, PageNumberGuess, Recipe, Technique, TextFragment};

const TITLE_WINDOW: usize = 5;
const TITLE_MIN_CONFIDENCE: f64 = 0.7;
const TITLE_MAX_CHARS: usize = 50;
const FALLBACK_INGREDIENT_MIN_CHARS: usize = 3;
const PARAGRAPH_MIN_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct TitleGuess {
    pub text: String,
    pub confidence: f64,
}

/// Build a recipe from a page's fragments, or `None` when no title exists.
pub fn parse_recipe(fragments: &[TextFragment], page_id: &str) -> Option<Recipe> {
    let sorted = sort_by_vertical_position(fragments);

    let title = extract_title(&sorted)?;
    let page_number = extract_page_number(fragments);
    let ingredients = extract_ingredients(&sorted);
    let instructions = extract_instructions(&sorted);
    let techniques = extract_techniques(&sorted);

    Some(Recipe {
        id: Uuid::new_v4().to_string(),
        page_id: page_id.to_string(),
        title: title.text,
        title_confidence: title.confidence,
        page_number: page_number.map(|guess| guess.value),
        page_number_confidence: page_number.map(|guess| guess.confidence),
        ingredients,
        instructions,
        techniques: (!techniques.is_empty()).then_some(techniques),
        raw_markdown: String::new(),
    })
}

fn sort_by_vertical_position(fragments: &[TextFragment]) -> Vec<&TextFragment> {
    let mut sorted: Vec<&TextFragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.y().total_cmp(&b.y()));
    sorted
}

fn is_blank(fragment: &TextFragment) -> bool {
    fragment.text.trim().is_empty()
}

fn is_title_candidate(fragment: &TextFragment) -> bool {
    !is_blank(fragment)
        && fragment.confidence > TITLE_MIN_CONFIDENCE
        && fragment.char_len() < TITLE_MAX_CHARS
        && !is_bare_page_number(&fragment.text)
        && !is_section_header(&fragment.text)
}

/// First qualifying fragment among the top few.
///
/// Without a qualifying fragment the first non-blank one stands in, unless the
/// page has no section headers at all and that fragment is itself
/// low-confidence: unstructured noise does not make a recipe.
pub fn extract_title(sorted: &[&TextFragment]) -> Option<TitleGuess> {
    let top = &sorted[..sorted.len().min(TITLE_WINDOW)];

    if let Some(candidate) = top.iter().find(|fragment| is_title_candidate(fragment)) {
        return Some(TitleGuess {
            text: candidate.text.clone(),
            confidence: candidate.confidence,
        });
    }

    let first = top.iter().find(|fragment| !is_blank(fragment))?;
    let has_structure = sorted.iter().any(|fragment| is_section_header(&fragment.text));
    if !has_structure && first.confidence <= TITLE_MIN_CONFIDENCE {
        return None;
    }

    Some(TitleGuess {
        text: first.text.clone(),
        confidence: first.confidence,
    })
}

/// Recipe-local page number, taken from recognition order.
pub fn extract_page_number(fragments: &[TextFragment]) -> Option<PageNumberGuess> {
    fragments.iter().find_map(|fragment| {
        recipe_page_number(&fragment.text).map(|value| PageNumberGuess {
            value,
            confidence: fragment.confidence,
        })
    })
}

fn ingredient_from(fragment: &TextFragment, cleaned: String) -> Ingredient {
    let parts = parse_ingredient_line(&fragment.text);
    Ingredient {
        text: cleaned,
        confidence: fragment.confidence,
        quantity: parts.quantity,
        unit: parts.unit,
        item: parts.item,
    }
}

/// Lines between the ingredients header and the instructions header.
///
/// Pages without an ingredients header fall back to any bulleted line.
pub fn extract_ingredients(sorted: &[&TextFragment]) -> Vec<Ingredient> {
    let mut ingredients = Vec::new();
    let mut header_found = false;
    let mut in_section = false;

    for fragment in sorted {
        if is_ingredients_header(&fragment.text) {
            header_found = true;
            in_section = true;
            continue;
        }
        if in_section && is_instructions_header(&fragment.text) {
            break;
        }
        if !in_section || is_section_header(&fragment.text) {
            continue;
        }

        let cleaned = strip_list_marker(&fragment.text);
        if !cleaned.is_empty() {
            ingredients.push(ingredient_from(fragment, cleaned));
        }
    }

    if header_found {
        return ingredients;
    }

    sorted
        .iter()
        .filter(|fragment| is_bulleted_item(&fragment.text) && !is_section_header(&fragment.text))
        .filter_map(|fragment| {
            let cleaned = strip_list_marker(&fragment.text);
            (cleaned.chars().count() > FALLBACK_INGREDIENT_MIN_CHARS)
                .then(|| ingredient_from(fragment, cleaned))
        })
        .collect()
}

/// Everything after the instructions header, to the end of the page.
pub fn extract_instructions(sorted: &[&TextFragment]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut in_section = false;

    for fragment in sorted {
        if is_instructions_header(&fragment.text) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }

        if let Some((step, text)) = numbered_step(&fragment.text) {
            instructions.push(Instruction {
                step_number: Some(step),
                text,
                confidence: fragment.confidence,
            });
        } else if fragment.char_len() > PARAGRAPH_MIN_CHARS && !is_section_header(&fragment.text) {
            instructions.push(Instruction {
                step_number: None,
                text: fragment.text.clone(),
                confidence: fragment.confidence,
            });
        }
    }

    instructions
}

pub fn extract_techniques(sorted: &[&TextFragment]) -> Vec<Technique> {
    sorted
        .iter()
        .filter_map(|fragment| {
            technique_keyword(&fragment.text).map(|keyword| Technique {
                name: keyword.to_string(),
                description: fragment.text.clone(),
                confidence: fragment.confidence,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn lines(rows: &[(&str, f64)]) -> Vec<TextFragment> {
        rows.iter()
            .enumerate()
            .map(|(i, (text, confidence))| {
                TextFragment::new(
                    *text,
                    *confidence,
                    BoundingBox::new(10.0, 20.0 * i as f64, 100.0, 12.0),
                )
            })
            .collect()
    }

    #[test]
    fn title_skips_headers_and_page_numbers() {
        let fragments = lines(&[("12", 0.95), ("Ingredients", 0.95), ("Lemon Tart", 0.9)]);
        let recipe = parse_recipe(&fragments, "page-1").unwrap();
        assert_eq!(recipe.title, "Lemon Tart");
        assert_eq!(recipe.page_number, Some(12));
        assert_eq!(recipe.page_number_confidence, Some(0.95));
    }

    #[test]
    fn title_falls_back_to_first_fragment_on_structured_pages() {
        let fragments = lines(&[("tomato sowp", 0.4), ("Ingredients", 0.6), ("- 2 tomatoes", 0.6)]);
        let recipe = parse_recipe(&fragments, "page-1").unwrap();
        assert_eq!(recipe.title, "tomato sowp");
        assert_eq!(recipe.title_confidence, 0.4);
    }

    #[test]
    fn blank_fragments_never_become_titles() {
        let fragments = lines(&[("   ", 0.95), ("Lemon Tart", 0.9), ("Method", 0.9)]);
        assert_eq!(parse_recipe(&fragments, "page-1").unwrap().title, "Lemon Tart");

        let fallback = lines(&[("", 0.95), ("tart lemn", 0.4), ("Method", 0.9)]);
        assert_eq!(parse_recipe(&fallback, "page-1").unwrap().title, "tart lemn");

        let only_blank = lines(&[(" ", 0.95), ("", 0.9)]);
        assert!(parse_recipe(&only_blank, "page-1").is_none());
    }

    #[test]
    fn no_fragments_means_no_recipe() {
        assert!(parse_recipe(&[], "page-1").is_none());
    }

    #[test]
    fn unstructured_low_confidence_page_yields_nothing() {
        let fragments = lines(&[("blurry", 0.4), ("smudge text", 0.5), ("more noise", 0.3)]);
        assert!(parse_recipe(&fragments, "page-1").is_none());
    }

    #[test]
    fn ingredients_stop_at_instructions_header() {
        let fragments = lines(&[
            ("Pancakes", 0.9),
            ("Ingredients", 0.9),
            ("• 2 cups flour", 0.9),
            ("Serves 4", 0.9),
            ("- 1 egg", 0.7),
            ("Method", 0.9),
            ("1. Whisk everything", 0.9),
        ]);
        let recipe = parse_recipe(&fragments, "page-1").unwrap();
        let texts: Vec<_> = recipe.ingredients.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["cups flour", "egg"]);
        assert_eq!(recipe.ingredients[0].quantity.as_deref(), Some("2"));
        assert_eq!(recipe.ingredients[0].unit.as_deref(), Some("cups"));
        assert_eq!(recipe.ingredients[0].item.as_deref(), Some("flour"));
    }

    #[test]
    fn bulleted_fallback_without_header() {
        let fragments = lines(&[
            ("Quick Salad", 0.9),
            ("- lettuce", 0.8),
            ("- oil", 0.8),
            ("Toss and serve immediately", 0.8),
        ]);
        let recipe = parse_recipe(&fragments, "page-1").unwrap();
        let texts: Vec<_> = recipe.ingredients.iter().map(|i| i.text.as_str()).collect();
        // "oil" is too short to count.
        assert_eq!(texts, vec!["lettuce"]);
        assert!(recipe.instructions.is_empty());
    }

    #[test]
    fn instructions_run_to_end_of_page() {
        let fragments = lines(&[
            ("Stew", 0.9),
            ("Directions", 0.9),
            ("1. Brown the meat", 0.9),
            ("Add stock and simmer for an hour", 0.8),
            ("short", 0.9),
            ("Ingredients", 0.9),
            ("2. Serve hot", 0.85),
        ]);
        let recipe = parse_recipe(&fragments, "page-1").unwrap();
        let steps: Vec<_> = recipe
            .instructions
            .iter()
            .map(|i| (i.step_number, i.text.as_str()))
            .collect();
        assert_eq!(
            steps,
            vec![
                (Some(1), "Brown the meat"),
                (None, "Add stock and simmer for an hour"),
                (Some(2), "Serve hot"),
            ]
        );
    }

    #[test]
    fn techniques_from_keywords() {
        let fragments = lines(&[("Risotto", 0.9), ("Tip: keep stirring", 0.75), ("Serve", 0.9)]);
        let recipe = parse_recipe(&fragments, "page-1").unwrap();
        let techniques = recipe.techniques();
        assert_eq!(techniques.len(), 1);
        assert_eq!(techniques[0].name, "tip");
        assert_eq!(techniques[0].description, "Tip: keep stirring");
    }

    #[test]
    fn no_techniques_is_none() {
        let fragments = lines(&[("Risotto", 0.9)]);
        let recipe = parse_recipe(&fragments, "page-1").unwrap();
        assert!(recipe.techniques.is_none());
        assert_eq!(recipe.page_id, "page-1");
    }
}
