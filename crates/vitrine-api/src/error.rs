use thiserror::Error;

/// Top-level error type for the `vitrine-api` crate.
///
/// Covers every failure mode across the service surfaces: HTTP transport,
/// query responses, and the change feed. `vitrine-core` maps these into the
/// degraded states a view can show.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Queries ─────────────────────────────────────────────────────
    /// The service rejected a query (non-2xx status or backend error).
    #[error("Query on '{collection}' failed (HTTP {status}): {message}")]
    Query {
        collection: String,
        status: u16,
        message: String,
    },

    /// The queried collection does not exist.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    // ── Change feed ─────────────────────────────────────────────────
    /// Change feed connection failed.
    #[error("Change feed connection failed: {0}")]
    FeedConnect(String),

    /// Change feed closed unexpectedly.
    #[error("Change feed closed (code {code}): {reason}")]
    FeedClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::FeedConnect(_) => true,
            Self::Query { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Query { status: 404, .. } | Self::UnknownCollection(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Query {
            collection: "projects".into(),
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn unknown_collection_is_not_found() {
        let err = Error::UnknownCollection("nope".into());
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }
}
