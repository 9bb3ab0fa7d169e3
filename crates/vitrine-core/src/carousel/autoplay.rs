// ── Autoplay scheduler ──
//
// At most one recurring timer per carousel. Arming always replaces the live
// timer, so duplicate intervals cannot exist; the first tick after arming
// is one full period away. `tick()` never resolves while disarmed, which
// makes it safe to poll unconditionally from a `select!` loop.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::state::TimerDirective;

/// Default autoplay period.
pub const DEFAULT_AUTOPLAY_PERIOD: Duration = Duration::from_millis(3000);

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct AutoplayScheduler {
    period: Duration,
    interval: Option<Interval>,
    arms: u64,
}

impl AutoplayScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            interval: None,
            arms: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// How many times the timer has been (re)armed.
    pub fn arm_count(&self) -> u64 {
        self.arms
    }

    pub fn apply(&mut self, directive: TimerDirective) {
        match directive {
            TimerDirective::Arm => self.arm(),
            TimerDirective::Disarm => self.disarm(),
            TimerDirective::Keep => {}
        }
    }

    pub fn arm(&mut self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
        self.arms += 1;
    }

    pub fn disarm(&mut self) {
        self.interval = None;
    }

    /// Wait for the next tick. Pending forever while disarmed.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl Default for AutoplayScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOPLAY_PERIOD)
    }
}

impl std::fmt::Debug for AutoplayScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoplayScheduler")
            .field("period", &self.period)
            .field("armed", &self.is_armed())
            .field("arms", &self.arms)
            .finish()
    }
}
