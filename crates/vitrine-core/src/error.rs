// ── Core error types ──
//
// User-facing errors from vitrine-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<vitrine_api::Error>`
// impl folds transport-layer errors into the degraded states a view shows.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Sync errors ──────────────────────────────────────────────────
    /// A fetch failed; the view falls back to "no items". `retryable` is
    /// set when the same query may succeed later.
    #[error("Query on '{collection}' failed: {message}")]
    QueryFailed {
        collection: String,
        message: String,
        retryable: bool,
    },

    /// The change feed dropped and will not be re-established.
    #[error("Change feed for '{collection}' lost: {reason}")]
    SubscriptionLost { collection: String, reason: String },

    // ── Input errors ─────────────────────────────────────────────────
    /// Filter value outside the enumerated set, or one the surface does
    /// not offer.
    #[error("Invalid filter '{value}' (expected {expected})")]
    InvalidFilter { value: String, expected: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    /// Operation sent to a surface that is not active.
    #[error("Surface '{collection}' is not active")]
    SurfaceInactive { collection: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Errors a view recovers from by showing an empty or stale state.
    pub fn is_degraded_state(&self) -> bool {
        matches!(
            self,
            Self::QueryFailed { .. } | Self::SubscriptionLost { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vitrine_api::Error> for CoreError {
    fn from(err: vitrine_api::Error) -> Self {
        use vitrine_api::Error as Api;

        let retryable = err.is_transient();
        match err {
            Api::Query {
                collection,
                status,
                message,
            } => CoreError::QueryFailed {
                collection,
                message: format!("HTTP {status}: {message}"),
                retryable,
            },
            Api::UnknownCollection(collection) => CoreError::QueryFailed {
                message: format!("collection '{collection}' does not exist"),
                collection,
                retryable,
            },
            Api::FeedConnect(reason) => CoreError::SubscriptionLost {
                collection: String::new(),
                reason,
            },
            Api::FeedClosed { code, reason } => CoreError::SubscriptionLost {
                collection: String::new(),
                reason: format!("closed with code {code}: {reason}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            Api::Transport(e) => CoreError::QueryFailed {
                collection: String::new(),
                message: e.to_string(),
                retryable,
            },
            Api::Timeout { timeout_secs } => CoreError::QueryFailed {
                collection: String::new(),
                message: format!("timed out after {timeout_secs}s"),
                retryable,
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
