//! Markdown rendering of a scan.
//!
//! The output is export-only. Items the recognizer was unsure about keep an
//! HTML comment with their confidence so a reader knows what to proofread.

use std::fmt::Write;

use crate::models::{Recipe, Scan};
use crate::processing::{format_confidence, ConfidenceThresholds};

pub const NO_RECIPES_PLACEHOLDER: &str = "*No recipes found in this scan*";
pub const FOOTER: &str = "*Generated with Shelf - Cookbook Scanner*";

pub fn render_markdown(scan: &Scan) -> String {
    let mut md = String::new();

    let _ = write!(md, "# {}\n\n", scan.name);

    let meta = &scan.metadata;
    if let Some(title) = non_blank(&meta.cookbook_title) {
        let _ = writeln!(md, "**Source:** {title}");
    }
    if let Some(author) = non_blank(&meta.author) {
        let _ = writeln!(md, "**Author:** {author}");
    }
    if let Some(notes) = non_blank(&meta.notes) {
        let _ = writeln!(md, "**Notes:** {notes}");
    }

    let _ = writeln!(md, "\n**Scanned:** {}", scan.created_at.format("%Y-%m-%d"));
    let _ = writeln!(md, "**Total Pages:** {}", scan.total_pages);
    md.push_str("\n---\n\n");

    let mut rendered_any = false;
    for recipe in scan.recipes() {
        md.push_str(&render_recipe(recipe));
        rendered_any = true;
    }
    if !rendered_any {
        md.push_str(NO_RECIPES_PLACEHOLDER);
        md.push('\n');
    }

    md.push_str("\n---\n\n");
    md.push_str(FOOTER);
    md.push('\n');
    md
}

/// One recipe block, closed by a horizontal rule.
pub fn render_recipe(recipe: &Recipe) -> String {
    let thresholds = ConfidenceThresholds::default();
    let mut md = String::new();

    let _ = write!(md, "## {}\n\n", recipe.title);
    if let Some(page) = recipe.page_number.filter(|page| *page > 0) {
        let _ = write!(md, "*Page {page}*\n\n");
    }

    if !recipe.ingredients.is_empty() {
        md.push_str("### Ingredients\n\n");
        for ingredient in &recipe.ingredients {
            let _ = write!(md, "- {}", ingredient.text);
            annotate(&mut md, ingredient.confidence, &thresholds);
            md.push('\n');
        }
        md.push('\n');
    }

    if !recipe.instructions.is_empty() {
        md.push_str("### Instructions\n\n");
        for (index, instruction) in recipe.instructions.iter().enumerate() {
            let step = instruction
                .step_number
                .filter(|step| *step > 0)
                .unwrap_or(index as u32 + 1);
            let _ = write!(md, "{step}. {}", instruction.text);
            annotate(&mut md, instruction.confidence, &thresholds);
            md.push_str("\n\n");
        }
    }

    let techniques = recipe.techniques();
    if !techniques.is_empty() {
        md.push_str("### Techniques\n\n");
        for technique in techniques {
            let _ = write!(md, "**{}:** {}\n\n", technique.name, technique.description);
        }
    }

    md.push_str("---\n\n");
    md
}

fn annotate(md: &mut String, confidence: f64, thresholds: &ConfidenceThresholds) {
    if thresholds.needs_review(confidence) {
        let _ = write!(md, " <!-- confidence: {} -->", format_confidence(confidence));
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.trim().is_empty())
}
