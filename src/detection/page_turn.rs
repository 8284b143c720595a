use super::similarity;
use crate::models::TextFragment;

pub const DEFAULT_PAGE_TURN_THRESHOLD: f64 = 0.3;

/// A page turn is a similarity strictly below `threshold`.
pub fn is_page_turn(current: &[TextFragment], previous: &[TextFragment], threshold: f64) -> bool {
    similarity(current, previous) < threshold
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnCheck {
    /// `None` for the first frame of a session.
    pub similarity: Option<f64>,
    pub is_turn: bool,
}

/// Frame-to-frame page-turn tracker for one live session.
#[derive(Debug, Clone)]
pub struct PageTurnDetector {
    threshold: f64,
    previous: Option<Vec<TextFragment>>,
}

impl Default for PageTurnDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_TURN_THRESHOLD)
    }
}

impl PageTurnDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare `current` with the last observed frame, then remember it.
    pub fn observe(&mut self, current: Vec<TextFragment>) -> TurnCheck {
        let check = match self.previous.as_deref() {
            None => TurnCheck {
                similarity: None,
                is_turn: false,
            },
            Some(previous) => {
                let score = similarity(&current, previous);
                TurnCheck {
                    similarity: Some(score),
                    is_turn: score < self.threshold,
                }
            }
        };
        self.previous = Some(current);
        check
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
