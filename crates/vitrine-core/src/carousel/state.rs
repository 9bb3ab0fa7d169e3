// ── Carousel state machine ──
//
// Pure and synchronous: owns the current index and the play/pause flag,
// and answers every event with a `TimerDirective` the autoplay scheduler
// obeys. Nothing here knows about time or items beyond their count.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Phase ────────────────────────────────────────────────────────────

/// Observable state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// No items; the index is inert.
    Idle,
    Playing,
    Paused,
}

/// What the autoplay timer must do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDirective {
    /// Start the timer, replacing any live one. The first tick is one full
    /// period away.
    Arm,
    /// Stop the timer if it is live.
    Disarm,
    /// Leave the timer as it is.
    Keep,
}

/// What happens to the index when a re-fetch replaces the items.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IndexPolicy {
    /// Keep the index; pull it back to the last item when out of range.
    #[default]
    Clamp,
    /// Keep the index; wrap it modulo the new length when out of range.
    Wrap,
    /// Always return to the first item.
    Reset,
}

// ── Carousel ─────────────────────────────────────────────────────────

/// Index and play/pause state for one rotating view.
///
/// Invariant: `index < len` whenever `len > 0`; `index == 0` when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
    is_playing: bool,
    hovered: bool,
    policy: IndexPolicy,
}

impl Carousel {
    /// A carousel with no items. `autoplay` is the initial play flag.
    pub fn new(autoplay: bool, policy: IndexPolicy) -> Self {
        Self {
            len: 0,
            index: 0,
            is_playing: autoplay,
            hovered: false,
            policy,
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        if self.len == 0 {
            Phase::Idle
        } else if self.is_playing {
            Phase::Playing
        } else {
            Phase::Paused
        }
    }

    /// Current index, `None` while idle.
    pub fn index(&self) -> Option<usize> {
        (self.len > 0).then_some(self.index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The logical play flag. Hover does not change it.
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// Whether the autoplay timer should be live right now.
    pub fn wants_timer(&self) -> bool {
        self.len > 0 && self.is_playing && !self.hovered
    }

    // ── Data ─────────────────────────────────────────────────────────

    /// A fetch produced `len` items. The timer is re-armed only when the
    /// count crosses zero.
    pub fn replace_items(&mut self, len: usize) -> TimerDirective {
        let was_empty = self.len == 0;
        self.len = len;

        if len == 0 {
            self.index = 0;
            return if was_empty {
                TimerDirective::Keep
            } else {
                TimerDirective::Disarm
            };
        }

        if was_empty {
            self.index = 0;
            return if self.wants_timer() {
                TimerDirective::Arm
            } else {
                TimerDirective::Keep
            };
        }

        self.index = match self.policy {
            IndexPolicy::Reset => 0,
            _ if self.index < len => self.index,
            IndexPolicy::Clamp => len - 1,
            IndexPolicy::Wrap => self.index % len,
        };
        TimerDirective::Keep
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// One autoplay period elapsed.
    pub fn tick(&mut self) -> TimerDirective {
        if !self.wants_timer() {
            return TimerDirective::Disarm;
        }
        self.index = (self.index + 1) % self.len;
        TimerDirective::Keep
    }

    pub fn next(&mut self) -> TimerDirective {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
        TimerDirective::Keep
    }

    pub fn prev(&mut self) -> TimerDirective {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
        TimerDirective::Keep
    }

    /// Jump to `index`, wrapped into range.
    pub fn go_to(&mut self, index: usize) -> TimerDirective {
        if self.len > 0 {
            self.index = index % self.len;
        }
        TimerDirective::Keep
    }

    // ── Play / pause ─────────────────────────────────────────────────

    pub fn toggle_autoplay(&mut self) -> TimerDirective {
        self.is_playing = !self.is_playing;
        if !self.is_playing {
            TimerDirective::Disarm
        } else if self.wants_timer() {
            TimerDirective::Arm
        } else {
            TimerDirective::Keep
        }
    }

    /// Hover suspends the timer without touching the play flag.
    pub fn pointer_enter(&mut self) -> TimerDirective {
        self.hovered = true;
        TimerDirective::Disarm
    }

    pub fn pointer_leave(&mut self) -> TimerDirective {
        self.hovered = false;
        if self.wants_timer() {
            TimerDirective::Arm
        } else {
            TimerDirective::Keep
        }
    }
}

impl Default for Carousel {
    fn default() -> Self {
        Self::new(true, IndexPolicy::default())
    }
}
