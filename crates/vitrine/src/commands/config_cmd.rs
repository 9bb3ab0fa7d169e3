//! Config subcommand handlers.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::Serialize;

use vitrine_config::{Config, Defaults, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// What `config show` prints: the loaded file with secrets masked.
#[derive(Serialize)]
struct ShownConfig<'a> {
    path: String,
    default_profile: Option<&'a str>,
    surfaces: Vec<&'a str>,
    defaults: &'a Defaults,
    profiles: BTreeMap<&'a str, Profile>,
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn validate_url(field: &str, raw: &str) -> Result<(), CliError> {
    raw.parse::<url::Url>()
        .map(|_| ())
        .map_err(|_| CliError::Validation {
            field: field.into(),
            reason: format!("invalid URL: {raw}"),
        })
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_file(global).display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let mut surfaces: Vec<&str> = cfg.surfaces.keys().map(String::as_str).collect();
            surfaces.sort_unstable();
            let shown = ShownConfig {
                path: config::config_file(global).display().to_string(),
                default_profile: cfg.default_profile.as_deref(),
                surfaces,
                defaults: &cfg.defaults,
                profiles: cfg
                    .profiles
                    .iter()
                    .map(|(name, p)| (name.as_str(), config::redacted(p)))
                    .collect(),
            };
            // Table mode has no natural layout for nested config; TOML it is.
            let out = output::render_single(
                &global.output,
                &shown,
                |s| toml::to_string_pretty(s).unwrap_or_else(|e| format!("<unrenderable: {e}>")),
                |s| s.path.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init {
            name,
            url,
            feed_url,
            api_key_env,
        } => {
            validate_url("url", &url)?;
            if let Some(ref feed_url) = feed_url {
                validate_url("feed-url", feed_url)?;
            }

            let mut cfg = config::load(global)?;
            let first = cfg.profiles.is_empty();
            let replaced = cfg
                .profiles
                .insert(
                    name.clone(),
                    Profile {
                        url,
                        feed_url,
                        api_key_env,
                        ..Profile::default()
                    },
                )
                .is_some();
            if first {
                cfg.default_profile = Some(name.clone());
            }
            config::save(global, &cfg)?;

            let path = config::config_file(global);
            if !global.quiet {
                let verb = if replaced { "Updated" } else { "Added" };
                eprintln!("{verb} profile '{name}' in {}", path.display());
                eprintln!("  Store an API key with: vitrine config set-key --profile {name}");
            }
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: vitrine config init --url <url>");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;
            if !cfg.profiles.contains_key(&name) {
                return Err(config::profile_not_found(name, &cfg));
            }
            cfg.default_profile = Some(name.clone());
            config::save(global, &cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetKey { profile } => {
            let cfg = config::load(global)?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            ensure_profile(&cfg, &profile_name)?;

            let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
            if key.is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }

            vitrine_config::store_api_key(&profile_name, &SecretString::from(key))?;
            eprintln!("API key stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

fn ensure_profile(cfg: &Config, name: &str) -> Result<(), CliError> {
    if cfg.profiles.contains_key(name) {
        Ok(())
    } else {
        Err(config::profile_not_found(name.to_owned(), cfg))
    }
}
