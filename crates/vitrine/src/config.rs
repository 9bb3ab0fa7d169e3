//! CLI configuration: thin wrapper around `vitrine_config`.
//!
//! Adds the resolution steps that depend on `GlobalOpts` flag overrides
//! (`--config`, `--url`, `--api-key`, ...).

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use vitrine_config::{Config, Profile};
use vitrine_core::{ServiceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config` / `VITRINE_CONFIG`, else the
/// platform location.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(vitrine_config::config_path)
}

/// Load the config file in effect. A missing file yields defaults; a
/// malformed one is an error.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(vitrine_config::load_config_from(&config_file(global))?)
}

pub fn save(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    Ok(vitrine_config::save_config_to(&config_file(global), cfg)?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `ServiceConfig` for this invocation.
///
/// A matching profile is used with flag overrides on top. Without one,
/// `--url` alone is enough; an explicitly named profile that does not
/// exist is an error.
pub fn service_config(global: &GlobalOpts, cfg: &Config) -> Result<ServiceConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        let mut service =
            vitrine_config::profile_to_service_config(profile, &profile_name, &cfg.defaults)?;
        apply_flags(&mut service, global)?;
        return Ok(service);
    }

    if global.profile.is_some() {
        return Err(profile_not_found(profile_name, cfg));
    }

    let url = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_file(global).display().to_string(),
    })?;
    let mut service = ServiceConfig::new(parse_url("url", url)?);
    service.timeout = Duration::from_secs(cfg.defaults.timeout);
    apply_flags(&mut service, global)?;
    Ok(service)
}

fn apply_flags(service: &mut ServiceConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref url) = global.url {
        service.url = parse_url("url", url)?;
    }
    if let Some(ref feed_url) = global.feed_url {
        service.feed_url = Some(parse_url("feed-url", feed_url)?);
    }
    if let Some(ref key) = global.api_key {
        service.api_key = Some(SecretString::from(key.clone()));
    }
    if global.insecure {
        service.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        service.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

pub fn profile_not_found(name: String, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

/// A copy of `profile` safe to print: secrets replaced by a marker.
pub fn redacted(profile: &Profile) -> Profile {
    Profile {
        url: profile.url.clone(),
        feed_url: profile.feed_url.clone(),
        api_key: profile.api_key.as_ref().map(|_| "********".into()),
        api_key_env: profile.api_key_env.clone(),
        ca_cert: profile.ca_cert.clone(),
        insecure: profile.insecure,
        timeout: profile.timeout,
        feed_max_retries: profile.feed_max_retries,
    }
}
