// ── Surface commands ──
//
// Every view operation is a message to the surface's event loop. The loop
// answers each with the snapshot that resulted from it.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::SurfaceSnapshot;
use crate::filter::Filter;

/// A command envelope sent through the command channel.
pub(crate) struct CommandEnvelope {
    pub command: SurfaceCommand,
    pub response_tx: oneshot::Sender<Arc<SurfaceSnapshot>>,
}

/// All operations a view can perform on a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SurfaceCommand {
    // ── Navigation ───────────────────────────────────────────────────
    Next,
    Prev,
    GoTo(usize),

    // ── Playback ─────────────────────────────────────────────────────
    ToggleAutoplay,
    PointerEnter,
    PointerLeave,

    // ── Touch ────────────────────────────────────────────────────────
    TouchStart(f64),
    TouchMove(f64),
    TouchEnd,

    // ── Data ─────────────────────────────────────────────────────────
    SetFilter(Filter),
    Refresh,

    /// No-op; answers with the current snapshot.
    Snapshot,
}
