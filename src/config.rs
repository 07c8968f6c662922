//! Configuration for a [`RemoteApp`](crate::RemoteApp).

use std::time::Duration;

use url::Url;

use crate::error::{RemoteError, Result};

/// Default capacity of the bounded push-event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful push-channel shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// API base URL used by [`RemoteConfig::from_env`] when nothing is set.
pub const DEFAULT_API_URL: &str = "http://localhost:8001";

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "PICKLEBALL_API_URL";

/// Environment variable holding an explicit push-channel base URL.
pub const PUSH_URL_ENV: &str = "PICKLEBALL_PUSH_URL";

/// Where the scoring service lives and how the push channel is tuned.
///
/// # Example
///
/// ```
/// use pickleball_remote::RemoteConfig;
///
/// let config = RemoteConfig::new("http://scores.example:8001").unwrap();
/// assert_eq!(
///     config.push_url("ABC123").unwrap().as_str(),
///     "ws://scores.example:8001/ws/session/ABC123"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the HTTP session API.
    pub api_base_url: Url,
    /// Base URL of the push channel. Derived from `api_base_url` unless set.
    pub push_base_url: Url,
    /// Capacity of the bounded push-event channel.
    ///
    /// When the consumer falls behind, events other than `Closed` are dropped
    /// with a warning. Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`PushChannel::shutdown`](crate::PushChannel::shutdown) waits
    /// for a graceful close before aborting. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl RemoteConfig {
    /// Create a configuration for the given API base URL.
    ///
    /// The push base URL becomes the same origin with `http` mapped to `ws`
    /// and `https` mapped to `wss`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if `api_base_url` does not parse
    /// or has a scheme other than `http`/`https`.
    pub fn new(api_base_url: &str) -> Result<Self> {
        let api_base_url = parse_base(api_base_url)?;
        let push_scheme = match api_base_url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(RemoteError::InvalidUrl(format!(
                    "unsupported api scheme {other:?}"
                )))
            }
        };
        let mut push_base_url = api_base_url.clone();
        push_base_url
            .set_scheme(push_scheme)
            .map_err(|()| RemoteError::InvalidUrl(format!("cannot derive {push_scheme} url")))?;

        Ok(Self {
            api_base_url,
            push_base_url,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    /// Build a configuration from `PICKLEBALL_API_URL` and, if present,
    /// `PICKLEBALL_PUSH_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if either variable holds an
    /// unusable URL.
    pub fn from_env() -> Result<Self> {
        let api = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let config = Self::new(&api)?;
        match std::env::var(PUSH_URL_ENV) {
            Ok(push) => config.with_push_base_url(&push),
            Err(_) => Ok(config),
        }
    }

    /// Use an explicit push-channel base URL.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if `url` does not parse.
    pub fn with_push_base_url(mut self, url: &str) -> Result<Self> {
        self.push_base_url = parse_base(url)?;
        Ok(self)
    }

    /// Set the capacity of the bounded push-event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful push-channel shutdown.
    ///
    /// A zero timeout aborts the push loop without waiting.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// `{api}/api/session/{session_id}/{action}`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if the base cannot carry a path.
    pub fn api_url(&self, session_id: &str, action: &str) -> Result<Url> {
        join_segments(&self.api_base_url, &["api", "session", session_id, action])
    }

    /// `{push}/ws/session/{session_id}`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if the base cannot carry a path.
    pub fn push_url(&self, session_id: &str) -> Result<Url> {
        join_segments(&self.push_base_url, &["ws", "session", session_id])
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| RemoteError::InvalidUrl(format!("{raw:?}: {e}")))
}

/// Append percent-encoded path segments to `base`.
fn join_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| RemoteError::InvalidUrl(format!("{base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RemoteConfig::new("http://127.0.0.1:8001").unwrap();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.push_base_url.scheme(), "ws");
    }

    #[test]
    fn https_maps_to_wss() {
        let config = RemoteConfig::new("https://scores.example").unwrap();
        assert_eq!(
            config.push_url("X").unwrap().as_str(),
            "wss://scores.example/ws/session/X"
        );
    }

    #[test]
    fn api_url_appends_segments_after_base_path() {
        let config = RemoteConfig::new("http://host:8001/prefix/").unwrap();
        assert_eq!(
            config.api_url("ABC123", "end-set").unwrap().as_str(),
            "http://host:8001/prefix/api/session/ABC123/end-set"
        );
    }

    #[test]
    fn session_id_is_percent_encoded() {
        let config = RemoteConfig::new("http://host").unwrap();
        assert_eq!(
            config.api_url("a b/c", "join").unwrap().as_str(),
            "http://host/api/session/a%20b%2Fc/join"
        );
    }

    #[test]
    fn rejects_unparseable_and_non_http_urls() {
        assert!(matches!(
            RemoteConfig::new("not a url"),
            Err(RemoteError::InvalidUrl(_))
        ));
        assert!(matches!(
            RemoteConfig::new("ftp://host"),
            Err(RemoteError::InvalidUrl(_))
        ));
    }

    #[test]
    fn explicit_push_base_overrides_derived_one() {
        let config = RemoteConfig::new("http://api.example")
            .unwrap()
            .with_push_base_url("ws://push.example:9000")
            .unwrap();
        assert_eq!(
            config.push_url("S").unwrap().as_str(),
            "ws://push.example:9000/ws/session/S"
        );
    }

    #[test]
    fn builder_methods() {
        let config = RemoteConfig::new("http://h")
            .unwrap()
            .with_event_channel_capacity(0)
            .with_shutdown_timeout(Duration::from_millis(5));
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(5));
    }
}
