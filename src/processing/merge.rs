//! Spatial merging of recognized fragments into lines.

use std::cmp::Ordering;

use crate::models::TextFragment;

/// Fragments whose tops differ by less than this are ordered left to right.
const SORT_BAND: f64 = 10.0;
/// A fragment joins the current line when its top is this close to the line's.
const MERGE_DISTANCE: f64 = 15.0;

/// Merge spatially adjacent fragments into lines.
///
/// Input order does not matter. Fragments are ordered top to bottom, with
/// near-equal tops ordered left to right, then folded into lines. A merged
/// line keeps the origin and indices of its first fragment, its text is the
/// space-joined text, its confidence is the running pairwise mean and its
/// width reaches the right edge of the last fragment joined.
pub fn merge_fragments(fragments: &[TextFragment]) -> Vec<TextFragment> {
    let ordered = reading_order(fragments);

    let mut merged = Vec::new();
    let mut line: Option<TextFragment> = None;

    for candidate in ordered {
        let Some(current) = line.as_mut() else {
            line = Some(candidate.clone());
            continue;
        };

        if (candidate.y() - current.y()).abs() < MERGE_DISTANCE {
            current.text.push(' ');
            current.text.push_str(&candidate.text);
            current.confidence = (current.confidence + candidate.confidence) / 2.0;
            current.bounding_box.width = candidate.bounding_box.right() - current.x();
        } else if let Some(done) = line.replace(candidate.clone()) {
            merged.push(done);
        }
    }

    if let Some(done) = line {
        merged.push(done);
    }

    merged
}

/// Top-to-bottom order with left-to-right order inside each band of
/// near-equal tops. Bands open at their topmost fragment so the order is
/// total and deterministic.
fn reading_order(fragments: &[TextFragment]) -> Vec<&TextFragment> {
    let mut by_y: Vec<&TextFragment> = fragments.iter().collect();
    by_y.sort_by(|a, b| {
        a.y()
            .total_cmp(&b.y())
            .then_with(|| a.x().total_cmp(&b.x()))
            .then_with(|| a.text.cmp(&b.text))
    });

    let mut ordered = Vec::with_capacity(by_y.len());
    let mut start = 0;
    while start < by_y.len() {
        let band_top = by_y[start].y();
        let mut end = start + 1;
        while end < by_y.len() && by_y[end].y() - band_top < SORT_BAND {
            end += 1;
        }

        let mut band = by_y[start..end].to_vec();
        band.sort_by(|a, b| match a.x().total_cmp(&b.x()) {
            Ordering::Equal => a.y().total_cmp(&b.y()),
            other => other,
        });
        ordered.extend(band);
        start = end;
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn fragment(text: &str, confidence: f64, x: f64, y: f64, width: f64) -> TextFragment {
        TextFragment::new(text, confidence, BoundingBox::new(x, y, width, 12.0))
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(merge_fragments(&[]).is_empty());
    }

    #[test]
    fn single_fragment_is_unchanged() {
        let only = fragment("Tomato Soup", 0.93, 10.0, 20.0, 80.0);
        let merged = merge_fragments(std::slice::from_ref(&only));
        assert_eq!(merged, vec![only]);
    }

    #[test]
    fn joins_fragments_on_the_same_line() {
        let merged = merge_fragments(&[
            fragment("Soup", 0.8, 60.0, 21.0, 30.0),
            fragment("Tomato", 0.9, 10.0, 20.0, 40.0),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Tomato Soup");
        assert!((merged[0].confidence - 0.85).abs() < 1e-9);
        assert_eq!(merged[0].x(), 10.0);
        assert_eq!(merged[0].bounding_box.width, 80.0);
    }

    #[test]
    fn distant_fragments_start_new_lines() {
        let merged = merge_fragments(&[
            fragment("2 tomatoes", 0.9, 10.0, 60.0, 50.0),
            fragment("Ingredients", 0.9, 10.0, 40.0, 50.0),
            fragment("Tomato Soup", 0.9, 10.0, 20.0, 50.0),
        ]);

        let texts: Vec<_> = merged.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Tomato Soup", "Ingredients", "2 tomatoes"]);
    }

    #[test]
    fn merge_distance_is_measured_from_line_origin() {
        // 14 from the origin joins, 15 does not.
        let merged = merge_fragments(&[
            fragment("a", 0.9, 0.0, 0.0, 5.0),
            fragment("b", 0.9, 10.0, 14.0, 5.0),
            fragment("c", 0.9, 20.0, 15.0, 5.0),
        ]);
        let texts: Vec<_> = merged.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["a b", "c"]);
    }

    #[test]
    fn output_does_not_depend_on_input_order() {
        let a = fragment("Preheat", 0.9, 0.0, 100.0, 40.0);
        let b = fragment("oven", 0.7, 45.0, 104.0, 30.0);
        let c = fragment("Serves 4", 0.9, 0.0, 140.0, 40.0);

        let forward = merge_fragments(&[a.clone(), b.clone(), c.clone()]);
        let backward = merge_fragments(&[c, b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].text, "Preheat oven");
    }
}
