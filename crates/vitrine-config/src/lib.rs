//! Shared configuration for vitrine.
//!
//! TOML profiles, per-surface overrides, credential resolution (env +
//! keyring + plaintext), and translation to `vitrine_core::ServiceConfig`
//! and `vitrine_core::SurfaceConfig`. The CLI layers its flags on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use vitrine_api::{Direction, OrderBy};
use vitrine_core::{Filter, IndexPolicy, ServiceConfig, SurfaceConfig, TlsVerification};

/// Keyring service name under which API keys are stored.
pub const KEYRING_SERVICE: &str = "vitrine";

/// Prefix for environment overrides (`VITRINE_DEFAULT_PROFILE`,
/// `VITRINE_PROFILES__PROD__URL`, ...).
pub const ENV_PREFIX: &str = "VITRINE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("unknown surface '{surface}' (no preset and no [surfaces.{surface}] collection)")]
    UnknownSurface { surface: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Per-surface overrides, keyed by surface name.
    #[serde(default)]
    pub surfaces: HashMap<String, SurfaceOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            surfaces: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named collection-service profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Service root (e.g., "https://db.example.com").
    pub url: String,

    /// Change-feed root (e.g., "wss://db.example.com/feed"). Live updates
    /// are off without one.
    pub feed_url: Option<String>,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub insecure: bool,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Feed reconnect attempts before giving up; 0 retries forever.
    pub feed_max_retries: Option<u32>,
}

/// Overrides for one surface. Unset fields keep the preset's value; a
/// surface without a preset must name its collection.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceOverride {
    pub collection: Option<String>,
    pub order_by: Option<String>,
    pub direction: Option<Direction>,
    pub limit: Option<usize>,
    pub filter: Option<Filter>,
    pub autoplay: Option<bool>,
    pub autoplay_interval_ms: Option<u64>,
    pub swipe_threshold: Option<f64>,
    pub index_policy: Option<IndexPolicy>,
    pub live: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "vitrine", "vitrine").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vitrine");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is not
/// an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/api-key"),
    )?)
}

/// Resolve an API key from the credential chain: the profile's
/// `api_key_env`, then the system keyring, then plaintext config.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(val) = profile
        .api_key_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(val));
    }

    if let Some(secret) = keyring_entry(profile_name)
        .ok()
        .and_then(|entry| entry.get_password().ok())
    {
        return Ok(SecretString::from(secret));
    }

    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring.
pub fn store_api_key(profile_name: &str, key: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key.expose_secret())?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `ServiceConfig` from a profile. A missing API key is allowed:
/// public collections are readable anonymously.
pub fn profile_to_service_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ServiceConfig, ConfigError> {
    let mut service = ServiceConfig::new(parse_url("url", &profile.url)?);

    service.feed_url = profile
        .feed_url
        .as_deref()
        .map(|raw| parse_url("feed_url", raw))
        .transpose()?;

    service.api_key = match resolve_api_key(profile, profile_name) {
        Ok(key) => Some(key),
        Err(ConfigError::NoCredentials { .. }) => None,
        Err(e) => return Err(e),
    };

    service.tls = if profile.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    service.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    if let Some(retries) = profile.feed_max_retries {
        service.feed_max_retries = (retries > 0).then_some(retries);
    }

    Ok(service)
}

/// Resolve a surface: its preset (if any) with `[surfaces.<name>]`
/// overrides applied on top.
pub fn surface_config(cfg: &Config, name: &str) -> Result<SurfaceConfig, ConfigError> {
    let overrides = cfg.surfaces.get(name).cloned().unwrap_or_default();

    let base = match (SurfaceConfig::preset(name), overrides.collection.as_deref()) {
        (Some(preset), None) => preset,
        (Some(preset), Some(collection)) => SurfaceConfig {
            collection: collection.into(),
            ..preset
        },
        (None, Some(collection)) => SurfaceConfig::new(name, collection),
        (None, None) => {
            return Err(ConfigError::UnknownSurface {
                surface: name.into(),
            });
        }
    };

    apply_overrides(base, &overrides)
}

fn apply_overrides(
    mut surface: SurfaceConfig,
    overrides: &SurfaceOverride,
) -> Result<SurfaceConfig, ConfigError> {
    if overrides.order_by.is_some() || overrides.direction.is_some() {
        surface.order = OrderBy {
            field: overrides
                .order_by
                .clone()
                .unwrap_or_else(|| surface.order.field.clone()),
            direction: overrides.direction.unwrap_or(surface.order.direction),
        };
    }
    if overrides.limit.is_some() {
        surface.limit = overrides.limit;
    }
    if let Some(filter) = overrides.filter {
        surface.initial_filter = surface.check_filter(filter).map_err(|e| ConfigError::Validation {
            field: "filter".into(),
            reason: e.to_string(),
        })?;
    }
    if let Some(autoplay) = overrides.autoplay {
        surface.autoplay = autoplay;
    }
    if let Some(ms) = overrides.autoplay_interval_ms {
        if ms == 0 {
            return Err(ConfigError::Validation {
                field: "autoplay_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        surface.autoplay_interval = Duration::from_millis(ms);
    }
    if let Some(threshold) = overrides.swipe_threshold {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Validation {
                field: "swipe_threshold".into(),
                reason: format!("expected a non-negative distance, got {threshold}"),
            });
        }
        surface.swipe_threshold = threshold;
    }
    if let Some(policy) = overrides.index_policy {
        surface.index_policy = policy;
    }
    if let Some(live) = overrides.live {
        surface.live = live;
    }
    Ok(surface)
}
