//! Quantity/unit/item decomposition of an ingredient line.

use std::sync::OnceLock;

use regex::Regex;

const UNITS: &[&str] = &[
    "cup", "cups", "c", "tbsp", "tbs", "tablespoon", "tablespoons", "tsp", "teaspoon",
    "teaspoons", "g", "gram", "grams", "kg", "mg", "ml", "l", "liter", "liters", "litre",
    "litres", "oz", "ounce", "ounces", "lb", "lbs", "pound", "pounds", "pinch", "pinches",
    "dash", "dashes", "clove", "cloves", "can", "cans", "slice", "slices", "stick", "sticks",
    "package", "packages", "pint", "pints", "quart", "quarts", "bunch", "bunches", "handful",
    "sprig", "sprigs",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientParts {
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub item: Option<String>,
}

fn leading_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[-•*]\s*|[0-9]+[.)]\s+)+").expect("ingredient marker regex is valid")
    })
}

fn quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^((?:[0-9]+\s+)?[0-9]+/[0-9]+|[0-9]+(?:\.[0-9]+)?(?:\s*[½⅓⅔¼¾⅛⅜⅝⅞])?|[½⅓⅔¼¾⅛⅜⅝⅞])(?:\s*-\s*[0-9]+(?:\.[0-9]+)?)?\s*(.*)$",
        )
        .expect("ingredient quantity regex is valid")
    })
}

/// Split a raw ingredient line into quantity, unit and item.
///
/// `"2 cups flour"` -> `2` / `cups` / `flour`. Lines without a leading
/// quantity keep the whole line as the item.
pub fn parse_ingredient_line(raw: &str) -> IngredientParts {
    let line = leading_marker_re().replace(raw.trim(), "");
    let line = line.trim();
    if line.is_empty() {
        return IngredientParts::default();
    }

    let Some(caps) = quantity_re().captures(line) else {
        return IngredientParts {
            item: Some(line.to_string()),
            ..IngredientParts::default()
        };
    };

    let whole = caps.get(0).map_or("", |m| m.as_str());
    let rest = caps.get(2).map_or("", |m| m.as_str());
    // Everything between the start of the line and the remainder is the quantity.
    let quantity = whole[..whole.len() - rest.len()].trim().to_string();

    let (unit, item) = split_unit(rest);
    IngredientParts {
        quantity: Some(quantity),
        unit,
        item,
    }
}

fn split_unit(rest: &str) -> (Option<String>, Option<String>) {
    let rest = rest.trim();
    let (first, remainder) = match rest.split_once(char::is_whitespace) {
        Some((first, remainder)) => (first, remainder.trim()),
        None => (rest, ""),
    };

    let candidate = first.trim_end_matches('.').to_lowercase();
    if !candidate.is_empty() && UNITS.contains(&candidate.as_str()) {
        let item = remainder.strip_prefix("of ").unwrap_or(remainder).trim();
        return (Some(first.to_string()), non_empty(item));
    }

    (None, non_empty(rest))
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(quantity: Option<&str>, unit: Option<&str>, item: Option<&str>) -> IngredientParts {
        IngredientParts {
            quantity: quantity.map(String::from),
            unit: unit.map(String::from),
            item: item.map(String::from),
        }
    }

    #[test]
    fn quantity_unit_item() {
        assert_eq!(
            parse_ingredient_line("2 cups flour"),
            parts(Some("2"), Some("cups"), Some("flour"))
        );
        assert_eq!(
            parse_ingredient_line("- 1 1/2 tsp. salt"),
            parts(Some("1 1/2"), Some("tsp."), Some("salt"))
        );
        assert_eq!(
            parse_ingredient_line("• ½ cup of sugar"),
            parts(Some("½"), Some("cup"), Some("sugar"))
        );
    }

    #[test]
    fn quantity_without_unit() {
        assert_eq!(
            parse_ingredient_line("2 tomatoes"),
            parts(Some("2"), None, Some("tomatoes"))
        );
        assert_eq!(
            parse_ingredient_line("2-3 cloves garlic"),
            parts(Some("2-3"), Some("cloves"), Some("garlic"))
        );
    }

    #[test]
    fn list_numbering_is_not_a_quantity() {
        assert_eq!(
            parse_ingredient_line("1. 200 g butter"),
            parts(Some("200"), Some("g"), Some("butter"))
        );
    }

    #[test]
    fn no_quantity_keeps_line_as_item() {
        assert_eq!(
            parse_ingredient_line("Salt to taste"),
            parts(None, None, Some("Salt to taste"))
        );
        assert_eq!(parse_ingredient_line("  "), IngredientParts::default());
    }
}
