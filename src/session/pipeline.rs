//! Per-frame pipeline: recognition, noise filtering, page-number and
//! page-turn detection, and the parse that runs when a page is committed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::state::LiveTracker;
use crate::detection::{detect_page_number, filter_meaningful, FrameContext, TurnCheck};
use crate::models::{Page, PageNumberGuess, Recipe, TextFragment};
use crate::ocr::{RecognitionError, RecognizedFrame, TextRecognizer};
use crate::processing::{merge_fragments, normalize};
use crate::recipe::parse_recipe;

#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Filtered fragments as recognized; what detection ran on.
    pub meaningful: Vec<TextFragment>,
    /// Fragments folded into lines; what the page keeps.
    pub lines: Vec<TextFragment>,
    pub page_number: Option<PageNumberGuess>,
    pub turn: TurnCheck,
}

/// Run detection for one recognized frame and advance the tracker.
///
/// Returns `None` when nothing meaningful survives filtering; the tracker is
/// left untouched in that case.
pub fn analyze_frame(tracker: &mut LiveTracker, frame: &RecognizedFrame) -> Option<FrameAnalysis> {
    let meaningful = filter_meaningful(&frame.fragments);
    if meaningful.is_empty() {
        return None;
    }

    let context = FrameContext::with_height(frame.height);
    let page_number = detect_page_number(&meaningful, &context);
    if let Some(guess) = page_number {
        // Last detection wins, with no drift reconciliation.
        tracker.detected_page_number = Some(guess);
        tracker.page_counter = guess.value;
    }

    let turn = tracker.page_turns.observe(meaningful.clone());
    if turn.is_turn && page_number.is_none() {
        tracker.page_counter = tracker.page_counter.saturating_add(1);
        tracker.detected_page_number = None;
    }

    // Merge thresholds are in pixels, so only frames with a known pixel size
    // are folded into lines.
    let lines = if context.height.is_some() {
        merge_fragments(&meaningful)
    } else {
        meaningful.clone()
    };

    Some(FrameAnalysis {
        meaningful,
        lines,
        page_number,
        turn,
    })
}

/// Parse a page's lines into a recipe, on normalized copies of the text.
pub fn parse_page(page: &Page) -> Option<Recipe> {
    let cleaned: Vec<TextFragment> = page
        .ocr_results
        .iter()
        .map(|fragment| TextFragment {
            text: normalize(&fragment.text),
            ..fragment.clone()
        })
        .filter(|fragment| !fragment.text.is_empty())
        .collect();
    parse_recipe(&cleaned, &page.id)
}

/// Recognize a frame on a blocking worker.
///
/// `None` means the session cancelled the call; the blocking work itself
/// runs to completion and its result is dropped.
pub async fn recognize_frame(
    recognizer: Arc<dyn TextRecognizer>,
    frame: PathBuf,
    timeout: Duration,
    cancel_token: CancellationToken,
) -> Option<Result<RecognizedFrame, RecognitionError>> {
    let work = tokio::task::spawn_blocking(move || recognizer.recognize(&frame));

    tokio::select! {
        joined = tokio::time::timeout(timeout, work) => Some(match joined {
            Err(_) => Err(RecognitionError::Timeout(timeout)),
            Ok(Err(join_err)) => Err(RecognitionError::Worker(join_err.to_string())),
            Ok(Ok(result)) => result,
        }),
        _ = cancel_token.cancelled() => None,
    }
}
