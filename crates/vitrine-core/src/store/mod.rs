// ── Per-surface storage ──

mod mirror;

pub use mirror::{FetchState, ItemSequence};
pub(crate) use mirror::ItemMirror;
