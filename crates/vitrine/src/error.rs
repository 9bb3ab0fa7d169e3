//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vitrine_config::ConfigError;
use vitrine_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Service ──────────────────────────────────────────────────────
    #[error("Query on '{collection}' failed: {message}")]
    #[diagnostic(
        code(vitrine::query_failed),
        help(
            "Check that the service is reachable and the collection exists.\n\
             Try: vitrine list -vv"
        )
    )]
    QueryFailed { collection: String, message: String },

    #[error("Query on '{collection}' failed: {message}")]
    #[diagnostic(
        code(vitrine::service_unavailable),
        help("The service looks temporarily unavailable. Retry in a moment.")
    )]
    ServiceUnavailable { collection: String, message: String },

    #[error("Change feed lost: {reason}")]
    #[diagnostic(
        code(vitrine::feed_lost),
        help("Check feed_url in your profile, or run without live updates.")
    )]
    FeedLost { reason: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(vitrine::no_credentials),
        help(
            "Store one with: vitrine config set-key --profile {profile}\n\
             Or set the VITRINE_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(code(vitrine::keyring))]
    Keyring { message: String },

    // ── Lookup ───────────────────────────────────────────────────────
    #[error("Unknown surface '{name}'")]
    #[diagnostic(
        code(vitrine::unknown_surface),
        help("Run: vitrine surfaces to see available surfaces")
    )]
    UnknownSurface { name: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vitrine::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: vitrine config init <name> --url <url>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vitrine::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No service configured")]
    #[diagnostic(
        code(vitrine::no_config),
        help(
            "Create a profile with: vitrine config init --url <url>\n\
             Or pass --url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("{message}")]
    #[diagnostic(code(vitrine::config))]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(vitrine::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(vitrine::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::QueryFailed { .. } | Self::ServiceUnavailable { .. } | Self::FeedLost { .. } => {
                exit_code::CONNECTION
            }
            Self::NoCredentials { .. } | Self::Keyring { .. } => exit_code::AUTH,
            Self::UnknownSurface { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render(err.to_string())
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::QueryFailed {
                collection,
                message,
                retryable: true,
            } => CliError::ServiceUnavailable {
                collection,
                message,
            },
            CoreError::QueryFailed {
                collection,
                message,
                retryable: false,
            } => CliError::QueryFailed {
                collection,
                message,
            },
            CoreError::SubscriptionLost { reason, .. } => CliError::FeedLost { reason },
            CoreError::InvalidFilter { value, expected } => CliError::Validation {
                field: "filter".into(),
                reason: format!("'{value}' is not accepted (expected {expected})"),
            },
            CoreError::SurfaceInactive { collection } => {
                CliError::Internal(format!("surface over '{collection}' is not active"))
            }
            CoreError::Config { message } => CliError::Config { message },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(see: vitrine config profiles)".into(),
            },
            ConfigError::UnknownSurface { surface } => CliError::UnknownSurface { name: surface },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Keyring(e) => CliError::Keyring {
                message: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => {
                CliError::Config {
                    message: other.to_string(),
                }
            }
        }
    }
}
