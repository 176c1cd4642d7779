//! Configuration types for kidsnote-dl

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behavior for transient failures
///
/// Retries use a constant delay between attempts. The upstream service is a
/// single low-volume host, so a fixed pause is preferred over exponential
/// backoff.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (default: 5 seconds)
    #[serde(default = "default_retry_delay", with = "duration_millis")]
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
        }
    }
}

/// Main configuration for [`KidsnoteDownloader`](crate::KidsnoteDownloader)
///
/// All fields have sensible defaults matching the upstream service; the base
/// URL is configurable primarily so tests can point at a mock server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the upstream service (default: "https://www.kidsnote.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent on every request (default: "Mozilla/5.0")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-attempt request timeout (default: 30 seconds)
    ///
    /// A timed-out attempt is terminal; only connection resets are re-issued.
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,

    /// Retry behavior for connection resets and media downloads
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pause between consecutive attachment downloads (default: 100 ms)
    ///
    /// Rate-limiting courtesy to the upstream host.
    #[serde(default = "default_item_delay", with = "duration_millis")]
    pub item_delay: Duration,

    /// Timezone sent as the `tz` query parameter on listing calls
    /// (default: "Asia/Seoul")
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            retry: RetryConfig::default(),
            item_delay: default_item_delay(),
            timezone: default_timezone(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.kidsnote.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_item_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

/// Serialize Durations as integer milliseconds for a stable config format
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
