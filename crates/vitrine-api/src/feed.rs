//! WebSocket change feed with auto-reconnect.
//!
//! Connects to `{feed_base}/{collection}` and turns every text frame into a
//! payload-free [`ChangeNotice`] on a [`tokio::sync::broadcast`] channel.
//! Reconnects with exponential backoff + jitter, including after a clean
//! close that comes too soon after connecting; every successful reconnect
//! emits a [`ChangeKind::Resync`] notice, since changes may have happened
//! while the socket was down. Once `max_retries` is exhausted the task exits
//! and the channel closes.
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrine_api::feed::{ReconnectConfig, WsFeed};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let base = Url::parse("wss://db.example.com/realtime/v1/collections")?;
//! let handle = WsFeed::connect(&base, "projects", ReconnectConfig::default(), CancellationToken::new(), None)?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(notice) = rx.recv().await {
//!     println!("{} changed ({})", notice.collection, notice.kind);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::service::{ChangeKind, ChangeNotice, FEED_CHANNEL_CAPACITY, FeedHandle};

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for feed reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: Some(8),
        }
    }
}

/// A clean close sooner than this after connecting is backed off like a
/// failure, so a server that accepts and hangs up cannot drive a resync loop.
const STABLE_SESSION: Duration = Duration::from_secs(30);

// ── WsFeed ───────────────────────────────────────────────────────────

/// Spawner for per-collection WebSocket feeds.
pub struct WsFeed;

impl WsFeed {
    /// Spawn the reconnection loop for one collection and return its handle.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Must be called from within a tokio runtime.
    pub fn connect(
        feed_base: &Url,
        collection: &str,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
        api_key: Option<SecretString>,
    ) -> Result<FeedHandle, Error> {
        let url = feed_url(feed_base, collection)?;
        let (notice_tx, notice_rx) = broadcast::channel(FEED_CHANNEL_CAPACITY);

        let task = FeedTask {
            url,
            collection: collection.to_owned(),
            notice_tx,
            reconnect,
            cancel: cancel.clone(),
            api_key,
        };
        tokio::spawn(task.run());

        Ok(FeedHandle::new(collection, notice_rx, cancel))
    }
}

/// `{feed_base}/{collection}`.
pub fn feed_url(feed_base: &Url, collection: &str) -> Result<Url, Error> {
    let mut url = feed_base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push(collection);
    Ok(url)
}

// ── Background reconnection loop ─────────────────────────────────────

struct FeedTask {
    url: Url,
    collection: String,
    notice_tx: broadcast::Sender<Arc<ChangeNotice>>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    api_key: Option<SecretString>,
}

impl FeedTask {
    /// Main loop: connect → read → on error, backoff → reconnect.
    ///
    /// Dropping `notice_tx` on exit is what closes the channel for every
    /// subscriber.
    async fn run(self) {
        let mut attempt: u32 = 0;
        let mut sessions: u64 = 0;

        loop {
            let connected_at = tokio::time::Instant::now();
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = self.connect_and_read(&mut sessions) => result,
            };

            match result {
                // Clean disconnect after a settled session. Reconnect
                // immediately with a fresh attempt counter.
                Ok(()) if connected_at.elapsed() >= STABLE_SESSION => {
                    tracing::info!(collection = %self.collection, "change feed disconnected, reconnecting");
                    attempt = 0;
                }
                Ok(()) => {
                    tracing::info!(collection = %self.collection, attempt, "change feed closed early");
                    if !self.backoff(attempt).await {
                        break;
                    }
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => {
                    tracing::warn!(collection = %self.collection, error = %e, attempt, "change feed error");

                    if let Some(max) = self.reconnect.max_retries {
                        if attempt >= max {
                            tracing::error!(
                                collection = %self.collection,
                                max_retries = max,
                                "change feed reconnection limit reached, giving up"
                            );
                            break;
                        }
                    }

                    if !self.backoff(attempt).await {
                        break;
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }

        tracing::debug!(collection = %self.collection, "change feed loop exiting");
    }

    /// Sleep out the backoff for `attempt`. Returns `false` if cancelled.
    async fn backoff(&self, attempt: u32) -> bool {
        let delay = calculate_backoff(attempt, &self.reconnect);
        tracing::debug!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// Establish a single connection and read until it drops.
    async fn connect_and_read(&self, sessions: &mut u64) -> Result<(), Error> {
        tracing::debug!(url = %self.url, "connecting change feed");

        let uri: tungstenite::http::Uri = self
            .url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::FeedConnect(e.to_string()))?;

        let mut request = ClientRequestBuilder::new(uri);
        if let Some(ref key) = self.api_key {
            request = request.with_header("apikey", key.expose_secret());
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::FeedConnect(e.to_string()))?;

        *sessions += 1;
        tracing::info!(collection = %self.collection, session = *sessions, "change feed connected");
        if *sessions > 1 {
            self.publish(ChangeKind::Resync);
        }

        let (_write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(()),
                frame = read.next() => {
                    match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            self.publish(parse_kind(&text));
                        }
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            tracing::trace!("change feed ping");
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            let Some(cf) = frame else { return Ok(()) };
                            tracing::info!(code = %cf.code, reason = %cf.reason, "change feed close frame");
                            // Anything but a normal or going-away close backs off like an error.
                            return match cf.code {
                                CloseCode::Normal | CloseCode::Away => Ok(()),
                                code => Err(Error::FeedClosed {
                                    code: code.into(),
                                    reason: cf.reason.to_string(),
                                }),
                            };
                        }
                        Some(Err(e)) => return Err(Error::FeedConnect(e.to_string())),
                        None => return Ok(()),
                        // Binary, Pong, Frame
                        _ => {}
                    }
                }
            }
        }
    }

    fn publish(&self, kind: ChangeKind) {
        tracing::debug!(collection = %self.collection, %kind, "change notice");
        // No subscribers right now is fine.
        let _ = self
            .notice_tx
            .send(Arc::new(ChangeNotice::new(&self.collection, kind)));
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FrameEnvelope {
    #[serde(default, alias = "eventType")]
    r#type: Option<String>,
}

/// Pull the event type out of a text frame for logging. Frames that are
/// not JSON still count as a change.
fn parse_kind(text: &str) -> ChangeKind {
    serde_json::from_str::<FrameEnvelope>(text)
        .ok()
        .and_then(|env| env.r#type)
        .map_or(ChangeKind::Other, |t| ChangeKind::parse_lossy(&t))
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 ± 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic spread seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_retries, Some(8));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        assert!(d10 <= Duration::from_millis(12_500), "got {d10:?}");
    }

    #[test]
    fn feed_url_appends_collection() {
        let base = Url::parse("ws://localhost:4000/realtime/v1/").unwrap();
        let url = feed_url(&base, "testimonials").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:4000/realtime/v1/testimonials");
    }

    #[test]
    fn frame_type_is_read_from_either_key() {
        assert_eq!(parse_kind(r#"{"type":"INSERT"}"#), ChangeKind::Insert);
        assert_eq!(parse_kind(r#"{"eventType":"DELETE","old":{}}"#), ChangeKind::Delete);
        assert_eq!(parse_kind("not json"), ChangeKind::Other);
        assert_eq!(parse_kind(r#"{"table":"projects"}"#), ChangeKind::Other);
    }

    #[tokio::test]
    async fn text_frames_become_notices() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(tungstenite::Message::text(r#"{"type":"UPDATE","table":"projects"}"#))
                .await
                .unwrap();
            // Hold the socket open until the client goes away.
            while ws.next().await.is_some() {}
        });

        let base = Url::parse(&format!("ws://{addr}/feed")).unwrap();
        let cancel = CancellationToken::new();
        let handle =
            WsFeed::connect(&base, "projects", ReconnectConfig::default(), cancel, None).unwrap();
        let mut rx = handle.subscribe();

        let notice = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.collection, "projects");
        assert_eq!(notice.kind, ChangeKind::Update);

        handle.shutdown();
    }

    #[tokio::test]
    async fn early_clean_close_waits_before_reconnecting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (accepted_tx, mut accepted_rx) = tokio::sync::mpsc::unbounded_channel();

        // Accept, then close normally straight away.
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                if accepted_tx.send(tokio::time::Instant::now()).is_err() {
                    break;
                }
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    let _ = ws.close(None).await;
                    while ws.next().await.is_some() {}
                });
            }
        });

        let base = Url::parse(&format!("ws://{addr}")).unwrap();
        let reconnect = ReconnectConfig {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(400),
            max_retries: Some(1),
        };
        let handle =
            WsFeed::connect(&base, "projects", reconnect, CancellationToken::new(), None).unwrap();
        let mut rx = handle.subscribe();

        let first = accepted_rx.recv().await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), accepted_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let gap = second - first;
        assert!(gap >= Duration::from_millis(180), "reconnected after {gap:?}");

        // Clean closes never exhaust retries; the second session still resyncs.
        let notice = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.kind, ChangeKind::Resync);

        handle.shutdown();
    }

    #[tokio::test]
    async fn exhausted_retries_close_the_channel() {
        // Reserve a port, then free it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("ws://{addr}")).unwrap();
        let reconnect = ReconnectConfig {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(10),
            max_retries: Some(1),
        };
        let handle =
            WsFeed::connect(&base, "services", reconnect, CancellationToken::new(), None).unwrap();
        let mut rx = handle.subscribe();

        let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(matches!(result, Err(broadcast::error::RecvError::Closed)));
    }
}
