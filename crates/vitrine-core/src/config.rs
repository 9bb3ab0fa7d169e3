// ── Runtime configuration ──
//
// These types describe how to reach the collection service and how each
// surface behaves. They carry credentials and tuning but never touch
// disk: the CLI builds them (via vitrine-config) and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use vitrine_api::{OrderBy, Query, ReconnectConfig, RestCollectionClient, TlsMode, TransportConfig};

use crate::carousel::{DEFAULT_AUTOPLAY_PERIOD, DEFAULT_SWIPE_THRESHOLD, IndexPolicy};
use crate::error::CoreError;
use crate::filter::Filter;
use crate::model::Category;

// ── Service ──────────────────────────────────────────────────────────

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-hosted development backends).
    DangerAcceptInvalid,
}

/// How to reach one collection service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service root, e.g. `https://db.example.com`.
    pub url: Url,
    /// Change-feed root; live updates are off without one.
    pub feed_url: Option<Url>,
    pub api_key: Option<SecretString>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Consecutive feed reconnect failures tolerated before the feed is
    /// reported lost. `None` retries forever.
    pub feed_max_retries: Option<u32>,
}

impl ServiceConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            feed_url: None,
            api_key: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            feed_max_retries: ReconnectConfig::default().max_retries,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
            api_key: self.api_key.clone(),
        }
    }

    /// Build the REST client (plus feed, when configured) this config
    /// describes.
    pub fn build_client(&self) -> Result<RestCollectionClient, CoreError> {
        let client = RestCollectionClient::new(self.url.as_str(), &self.transport())?;
        Ok(match &self.feed_url {
            Some(feed_url) => client.with_feed(
                feed_url.clone(),
                ReconnectConfig {
                    max_retries: self.feed_max_retries,
                    ..ReconnectConfig::default()
                },
            ),
            None => client,
        })
    }
}

// ── Surface ──────────────────────────────────────────────────────────

/// Behavior of one surface: which collection it shows, in what order,
/// and how its carousel moves.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    /// Name used in logs and configuration (`portfolio`, `services`, ...).
    pub name: String,
    pub collection: String,
    pub order: OrderBy,
    pub limit: Option<usize>,
    /// Predicate every query carries regardless of the selected filter,
    /// e.g. the category of a category page. `Filter::All` for none.
    pub scope: Filter,
    /// Filters a viewer may select. `Filter::All` is always accepted.
    pub filters: Vec<Filter>,
    pub initial_filter: Filter,
    /// Initial play flag of the carousel.
    pub autoplay: bool,
    pub autoplay_interval: Duration,
    pub swipe_threshold: f64,
    pub index_policy: IndexPolicy,
    /// Open a change feed on activation.
    pub live: bool,
}

impl SurfaceConfig {
    /// A surface over `collection` with the default ordering and carousel
    /// settings. Every filter value is selectable.
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            order: OrderBy::default(),
            limit: None,
            scope: Filter::All,
            filters: Filter::statuses().chain(Filter::categories()).collect(),
            initial_filter: Filter::All,
            autoplay: true,
            autoplay_interval: DEFAULT_AUTOPLAY_PERIOD,
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            index_policy: IndexPolicy::default(),
            live: true,
        }
    }

    // ── Presets ──────────────────────────────────────────────────────

    /// Projects, newest first, auto-advancing, filterable by status.
    pub fn portfolio() -> Self {
        Self {
            filters: Filter::statuses().collect(),
            ..Self::new("portfolio", "projects")
        }
    }

    /// Services in their configured display order. Not filterable.
    pub fn services() -> Self {
        Self {
            order: OrderBy::asc("sort_order"),
            filters: Vec::new(),
            autoplay: false,
            ..Self::new("services", "services")
        }
    }

    /// The four most recent testimonials. Not filterable.
    pub fn testimonials() -> Self {
        Self {
            limit: Some(4),
            filters: Vec::new(),
            autoplay: false,
            ..Self::new("testimonials", "testimonials")
        }
    }

    /// Projects of one category, narrowable by status.
    pub fn projects_by_category(category: Category) -> Self {
        Self {
            scope: Filter::Category(category),
            filters: Filter::statuses().collect(),
            autoplay: false,
            live: false,
            ..Self::new(format!("category:{}", category.slug()), "projects")
        }
    }

    /// Look up a preset by name. `category:<slug>` selects a category page.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "portfolio" | "projects" => Some(Self::portfolio()),
            "services" => Some(Self::services()),
            "testimonials" => Some(Self::testimonials()),
            other => other
                .strip_prefix("category:")
                .and_then(Category::from_slug)
                .map(Self::projects_by_category),
        }
    }

    pub const PRESETS: [&'static str; 3] = ["portfolio", "services", "testimonials"];

    /// Whether a viewer may select `filter` here.
    pub fn allows(&self, filter: Filter) -> bool {
        filter == Filter::All || self.filters.contains(&filter)
    }

    /// `filter` if this surface offers it, `InvalidFilter` otherwise.
    pub fn check_filter(&self, filter: Filter) -> Result<Filter, CoreError> {
        if self.allows(filter) {
            return Ok(filter);
        }
        let expected = std::iter::once(Filter::All)
            .chain(self.filters.iter().copied())
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(CoreError::InvalidFilter {
            value: filter.to_string(),
            expected: format!("one of {expected} on '{}'", self.name),
        })
    }

    /// The query this surface runs under `filter`: the scope first, then
    /// the selected filter.
    pub fn query(&self, filter: Filter) -> Query {
        let query = Query::new(&self.collection)
            .order_by(self.order.clone())
            .limit(self.limit);
        filter.apply_to(self.scope.apply_to(query))
    }
}
