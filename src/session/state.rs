use std::path::PathBuf;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::detection::PageTurnDetector;
use crate::models::{Page, PageNumberGuess, Scan, ScanStatus};

/// A page being built from live frames, not yet committed to its scan.
#[derive(Debug, Clone)]
pub struct PendingPage {
    pub page: Page,
    /// Frame the page content was last taken from.
    pub frame: PathBuf,
}

/// Frame-to-frame tracking for one live stretch of scanning.
#[derive(Debug, Clone)]
pub struct LiveTracker {
    pub page_turns: PageTurnDetector,
    /// Sequential page counter, overridden by any detected page number.
    pub page_counter: u32,
    pub detected_page_number: Option<PageNumberGuess>,
}

impl LiveTracker {
    pub fn new(threshold: f64, first_page: u32) -> Self {
        Self {
            page_turns: PageTurnDetector::new(threshold),
            page_counter: first_page.max(1),
            detected_page_number: None,
        }
    }

    /// Detected number when there is one, else the sequential counter.
    pub fn current_page_number(&self) -> u32 {
        self.detected_page_number
            .map(|guess| guess.value)
            .unwrap_or(self.page_counter)
    }
}

/// Everything the orchestrator mutates while a scan is live.
#[derive(Debug)]
pub struct SessionState {
    pub scan: Option<Scan>,
    pub tracker: LiveTracker,
    pub current_page: Option<PendingPage>,
    pub in_flight: bool,
    pub last_processed_at: Option<Instant>,
    /// Bumped on every reset so late recognition results can be recognized
    /// and dropped.
    pub generation: u64,
    pub cancel_token: CancellationToken,
    /// Set while the open scan is being stopped or deleted; no new frames
    /// are accepted.
    pub closing: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            scan: None,
            tracker: LiveTracker::new(crate::detection::DEFAULT_PAGE_TURN_THRESHOLD, 1),
            current_page: None,
            in_flight: false,
            last_processed_at: None,
            generation: 0,
            cancel_token: CancellationToken::new(),
            closing: false,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.scan
            .as_ref()
            .is_some_and(|scan| scan.status == ScanStatus::Active)
    }

    /// Whether a submitted frame may start recognition.
    pub fn accepts_frames(&self) -> bool {
        self.is_active() && !self.closing
    }

    /// Make `scan` the live scan with fresh frame tracking.
    pub fn begin(&mut self, scan: Scan, threshold: f64) {
        let first_page = scan.current_page;
        self.reset_live(threshold, first_page);
        self.scan = Some(scan);
        self.closing = false;
    }

    /// Cancel the running recognition and make its result stale. Pending
    /// page and tracking are left as they are.
    pub fn invalidate_in_flight(&mut self) {
        self.cancel_token.cancel();
        self.cancel_token = CancellationToken::new();
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = false;
    }

    /// Drop all frame-to-frame state and invalidate in-flight work.
    pub fn reset_live(&mut self, threshold: f64, first_page: u32) {
        self.invalidate_in_flight();
        self.tracker = LiveTracker::new(threshold, first_page);
        self.current_page = None;
        self.last_processed_at = None;
    }

    pub fn clear(&mut self) {
        let threshold = self.tracker.page_turns.threshold();
        self.reset_live(threshold, 1);
        self.scan = None;
        self.closing = false;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub scan: Option<Scan>,
    pub current_page: Option<Page>,
    pub current_page_number: u32,
    pub detected_page_number: Option<u32>,
    pub is_processing: bool,
}

impl SessionSnapshot {
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            scan: state.scan.clone(),
            current_page: state.current_page.as_ref().map(|pending| pending.page.clone()),
            current_page_number: state.tracker.current_page_number(),
            detected_page_number: state.tracker.detected_page_number.map(|guess| guess.value),
            is_processing: state.in_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanMetadata;
    use chrono::Utc;

    #[test]
    fn reset_invalidates_in_flight_work() {
        let mut state = SessionState::new();
        state.begin(Scan::new("Soups", ScanMetadata::default(), Utc::now()), 0.3);
        let token = state.cancel_token.clone();
        let generation = state.generation;
        state.in_flight = true;

        state.reset_live(0.3, 1);

        assert!(token.is_cancelled());
        assert!(!state.cancel_token.is_cancelled());
        assert_ne!(state.generation, generation);
        assert!(!state.in_flight);
        assert!(state.scan.is_some());
    }

    #[test]
    fn closing_keeps_pending_page_but_refuses_frames() {
        let mut state = SessionState::new();
        let scan = Scan::new("Soups", ScanMetadata::default(), Utc::now());
        let scan_id = scan.id.clone();
        state.begin(scan, 0.3);
        state.current_page = Some(PendingPage {
            page: Page::new(&scan_id, 1, Utc::now()),
            frame: PathBuf::from("a"),
        });
        let token = state.cancel_token.clone();
        let generation = state.generation;
        state.in_flight = true;

        state.closing = true;
        state.invalidate_in_flight();

        assert!(token.is_cancelled());
        assert_ne!(state.generation, generation);
        assert!(!state.in_flight);
        assert!(state.current_page.is_some());
        assert!(state.is_active());
        assert!(!state.accepts_frames());

        state.clear();
        assert!(!state.closing);
    }

    #[test]
    fn page_number_prefers_detection() {
        let mut tracker = LiveTracker::new(0.3, 4);
        assert_eq!(tracker.current_page_number(), 4);
        tracker.detected_page_number = Some(PageNumberGuess {
            value: 17,
            confidence: 0.9,
        });
        assert_eq!(tracker.current_page_number(), 17);
    }

    #[test]
    fn clear_forgets_scan() {
        let mut state = SessionState::new();
        state.begin(Scan::new("Soups", ScanMetadata::default(), Utc::now()), 0.3);
        assert!(state.is_active());
        state.clear();
        assert!(state.scan.is_none());
        assert!(!state.is_active());
    }
}
