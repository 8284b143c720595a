//! Recognizer backed by recorded recognition output.
//!
//! Each frame image `page_01.jpg` has a sidecar `page_01.json` holding what a
//! recognition engine returned for it, either as a full frame object or as a
//! bare fragment array. A `.json` frame path is read directly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{RecognitionError, RecognizedFrame, TextRecognizer};
use crate::models::TextFragment;
use crate::utils::validation::is_valid_confidence;

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Frame(RecognizedFrame),
    Fragments(Vec<TextFragment>),
}

#[derive(Debug, Default, Clone)]
pub struct FixtureRecognizer;

impl FixtureRecognizer {
    pub fn new() -> Self {
        Self
    }

    pub fn sidecar_path(frame: &Path) -> PathBuf {
        if is_json(frame) {
            frame.to_path_buf()
        } else {
            frame.with_extension("json")
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl TextRecognizer for FixtureRecognizer {
    fn recognize(&self, frame: &Path) -> Result<RecognizedFrame, RecognitionError> {
        let sidecar = Self::sidecar_path(frame);
        let unreadable = |reason: String| RecognitionError::UnreadableFrame {
            path: frame.to_path_buf(),
            reason,
        };

        let contents = fs::read_to_string(&sidecar)
            .map_err(|err| unreadable(format!("{}: {err}", sidecar.display())))?;
        let parsed: FixtureFile = serde_json::from_str(&contents)
            .map_err(|err| RecognitionError::Engine(format!("{}: {err}", sidecar.display())))?;

        let mut recognized = match parsed {
            FixtureFile::Frame(recognized) => recognized,
            FixtureFile::Fragments(fragments) => RecognizedFrame::new(fragments),
        };

        if let Some(bad) = recognized
            .fragments
            .iter()
            .find(|fragment| !is_valid_confidence(fragment.confidence))
        {
            return Err(RecognitionError::Engine(format!(
                "fragment {:?} has confidence {} outside 0-1",
                bad.text, bad.confidence
            )));
        }

        if recognized.height.is_none() && !is_json(frame) {
            if let Ok((width, height)) = image::image_dimensions(frame) {
                recognized.width = Some(f64::from(width));
                recognized.height = Some(f64::from(height));
            }
        }

        Ok(recognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_frame_object() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("page_01.json");
        fs::write(
            &frame,
            r#"{"width": 800, "height": 1000, "fragments": [
                {"text": "Tomato Soup", "confidence": 0.9,
                 "boundingBox": {"x": 10, "y": 20, "width": 200, "height": 30}}
            ]}"#,
        )
        .unwrap();

        let recognized = FixtureRecognizer::new().recognize(&frame).unwrap();
        assert_eq!(recognized.height, Some(1000.0));
        assert_eq!(recognized.fragments[0].text, "Tomato Soup");
    }

    #[test]
    fn reads_bare_fragment_array_from_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("page_02.png");
        fs::write(
            dir.path().join("page_02.json"),
            r#"[{"text": "42", "confidence": 0.95,
                 "boundingBox": {"x": 0.9, "y": 0.95, "width": 0.05, "height": 0.02},
                 "blockIndex": 3}]"#,
        )
        .unwrap();

        let recognized = FixtureRecognizer::new().recognize(&frame).unwrap();
        // No image on disk, so the size stays unknown.
        assert_eq!(recognized.height, None);
        assert_eq!(recognized.fragments[0].block_index, Some(3));
    }

    #[test]
    fn missing_sidecar_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = FixtureRecognizer::new()
            .recognize(&dir.path().join("nothing.png"))
            .unwrap_err();
        assert!(matches!(err, RecognitionError::UnreadableFrame { .. }));
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("bad.json");
        fs::write(
            &frame,
            r#"[{"text": "x", "confidence": 7, "boundingBox": {"x": 0, "y": 0, "width": 1, "height": 1}}]"#,
        )
        .unwrap();
        assert!(matches!(
            FixtureRecognizer::new().recognize(&frame),
            Err(RecognitionError::Engine(_))
        ));
    }
}
