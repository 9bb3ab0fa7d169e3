//! Clap derive structures for the `vitrine` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vitrine -- live collection carousels from the command line
#[derive(Debug, Parser)]
#[command(
    name = "vitrine",
    version,
    about = "Browse and watch live content collections from the command line",
    long_about = "Query portfolio, service, and testimonial collections from a\n\
        REST collection service, or watch one live: the carousel advances on\n\
        its own and every change on the backend triggers a re-fetch.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "VITRINE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "VITRINE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Service URL (overrides profile)
    #[arg(long, short = 'u', env = "VITRINE_URL", global = true)]
    pub url: Option<String>,

    /// Change-feed URL (overrides profile)
    #[arg(long, env = "VITRINE_FEED_URL", global = true)]
    pub feed_url: Option<String>,

    /// Service API key
    #[arg(long, env = "VITRINE_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VITRINE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "VITRINE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "VITRINE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a surface's items once
    #[command(alias = "ls")]
    List(ListArgs),

    /// Watch a surface live: autoplay, change feed, re-fetches
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Dashboard counts across projects, services, and testimonials
    Stats,

    /// List known surfaces (presets and configured)
    Surfaces,

    /// Run a scripted session against an in-memory collection
    Demo(DemoArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LIST / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Surface name: portfolio, services, testimonials, category:<slug>,
    /// or one defined under [surfaces.<name>]
    #[arg(default_value = "portfolio")]
    pub surface: String,

    /// Filter: all, completed, ongoing, or a category slug
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Maximum number of items
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Surface name
    #[arg(default_value = "portfolio")]
    pub surface: String,

    /// Filter: all, completed, ongoing, or a category slug
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Stop after this many seconds (runs until Ctrl-C otherwise)
    #[arg(long = "for", value_name = "SECONDS")]
    pub duration: Option<u64>,

    /// Autoplay period in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Start paused
    #[arg(long)]
    pub no_autoplay: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEMO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Autoplay period in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display current resolved configuration (secrets masked)
    Show,

    /// Add or replace a profile
    Init {
        /// Profile name
        #[arg(default_value = "default")]
        name: String,

        /// Service URL
        #[arg(long)]
        url: String,

        /// Change-feed URL
        #[arg(long)]
        feed_url: Option<String>,

        /// Environment variable holding the API key
        #[arg(long)]
        api_key_env: Option<String>,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
