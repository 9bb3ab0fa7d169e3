// ── Swipe recognition ──
//
// Tracks one touch interaction at a time and turns it into at most one
// navigation intent. State is dropped on every touch-end.

use serde::Serialize;

/// Minimum horizontal travel, in pixels, for a touch to count as a swipe.
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 50.0;

/// Navigation derived from a completed swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwipeIntent {
    /// Finger moved left.
    Next,
    /// Finger moved right.
    Prev,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureRecognizer {
    threshold: f64,
    start_x: Option<f64>,
    end_x: Option<f64>,
}

impl GestureRecognizer {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.abs(),
            start_x: None,
            end_x: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether a touch is in progress.
    pub fn is_tracking(&self) -> bool {
        self.start_x.is_some()
    }

    pub fn touch_start(&mut self, x: f64) {
        self.start_x = Some(x);
        self.end_x = None;
    }

    pub fn touch_move(&mut self, x: f64) {
        self.end_x = Some(x);
    }

    /// Finish the touch. `delta = start - end`; a touch with no move is a
    /// tap (delta 0). Travel must strictly exceed the threshold.
    pub fn touch_end(&mut self) -> Option<SwipeIntent> {
        let start = self.start_x.take();
        let end = self.end_x.take();

        let start = start?;
        let delta = start - end.unwrap_or(start);

        if delta.abs() <= self.threshold {
            None
        } else if delta > 0.0 {
            Some(SwipeIntent::Next)
        } else {
            Some(SwipeIntent::Prev)
        }
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD)
    }
}
