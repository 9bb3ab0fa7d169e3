// ── Carousel engine ──
//
// State machine, swipe recognizer, and autoplay timer. The first two are
// pure; only the scheduler touches tokio time.

pub mod autoplay;
pub mod gesture;
pub mod state;

pub use autoplay::{AutoplayScheduler, DEFAULT_AUTOPLAY_PERIOD};
pub use gesture::{DEFAULT_SWIPE_THRESHOLD, GestureRecognizer, SwipeIntent};
pub use state::{Carousel, IndexPolicy, Phase, TimerDirective};
