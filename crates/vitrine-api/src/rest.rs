// Async client for a PostgREST-style collection endpoint.
//
// Queries: GET {base}/rest/v1/{collection}?select=*&order=...&{field}=eq.{v}
// Auth:    apikey + Authorization: Bearer (when a key is configured)
// Feed:    WebSocket at {feed_base}/{collection}

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::feed::{ReconnectConfig, WsFeed};
use crate::query::Query;
use crate::record::Record;
use crate::service::{CollectionService, FeedHandle};
use crate::transport::TransportConfig;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Collection service backed by a PostgREST-compatible HTTP endpoint and a
/// WebSocket change feed.
pub struct RestCollectionClient {
    http: reqwest::Client,
    rest_base: Url,
    feed_base: Option<Url>,
    reconnect: ReconnectConfig,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl RestCollectionClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a service root URL and transport settings.
    ///
    /// `base_url` is the service root; `/rest/v1/` is appended unless it is
    /// already there.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            rest_base: Self::normalize_base_url(base_url)?,
            feed_base: None,
            reconnect: ReconnectConfig::default(),
            api_key: transport.api_key.clone(),
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            rest_base: Self::normalize_base_url(base_url)?,
            feed_base: None,
            reconnect: ReconnectConfig::default(),
            api_key: None,
            timeout_secs: 30,
        })
    }

    /// Enable change feeds rooted at `feed_base`.
    #[must_use]
    pub fn with_feed(mut self, feed_base: Url, reconnect: ReconnectConfig) -> Self {
        self.feed_base = Some(feed_base);
        self.reconnect = reconnect;
        self
    }

    /// `https://host` and `https://host/rest/v1` both become
    /// `https://host/rest/v1/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/rest/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/rest/v1/"));
        }
        Ok(url)
    }

    pub fn rest_base(&self) -> &Url {
        &self.rest_base
    }

    pub fn feed_base(&self) -> Option<&Url> {
        self.feed_base.as_ref()
    }

    // ── Response handling ────────────────────────────────────────────

    async fn fetch(&self, query: &Query) -> Result<Vec<Record>, Error> {
        let url = query.to_url(&self.rest_base)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                Error::Transport(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(&query.collection, status, resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn parse_error(
        collection: &str,
        status: reqwest::StatusCode,
        resp: reqwest::Response,
    ) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse {
                message: Some(message),
                hint,
            }) => match hint {
                Some(hint) => format!("{message} ({hint})"),
                None => message,
            },
            _ if raw.is_empty() => status.to_string(),
            _ => raw,
        };

        if status == reqwest::StatusCode::NOT_FOUND {
            return Error::UnknownCollection(collection.to_owned());
        }

        Error::Query {
            collection: collection.to_owned(),
            status: status.as_u16(),
            message,
        }
    }
}

impl CollectionService for RestCollectionClient {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, Error> {
        self.fetch(query).await
    }

    async fn watch(&self, collection: &str) -> Result<FeedHandle, Error> {
        let Some(ref feed_base) = self.feed_base else {
            return Err(Error::FeedConnect("no change feed configured".into()));
        };
        WsFeed::connect(
            feed_base,
            collection,
            self.reconnect.clone(),
            CancellationToken::new(),
            self.api_key.clone(),
        )
    }
}
