//! Configuration for the assessor engines.
//!
//! Every config has a `Default`, a `from_env()` reader and builder methods.

use std::time::Duration;

use crate::log_once::info_once;

/// Default number of recent messages read per turn.
pub const DEFAULT_RECENT_MESSAGES: usize = 50;

/// Bounds on the process-local matching memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Remembered candidate ids per user before the oldest are forgotten.
    pub max_seen: usize,
    /// Logged interactions per user before the oldest are dropped.
    pub max_interactions: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_seen: 10_000,
            max_interactions: 500,
        }
    }
}

/// Engine and runtime configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the profile database (default: None = in-memory).
    pub db_path: Option<String>,
    /// Recent messages read per turn (default: 50).
    pub recent_messages: usize,
    /// Check-in worker poll interval in seconds (default: 60).
    pub checkin_poll_seconds: u64,
    /// Whether to run the check-in worker (default: true).
    pub enable_checkins: bool,
    pub feed: FeedConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            recent_messages: DEFAULT_RECENT_MESSAGES,
            checkin_poll_seconds: 60,
            enable_checkins: true,
            feed: FeedConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_db_path(mut self, path: impl Into<String>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn with_recent_messages(mut self, limit: usize) -> Self {
        self.recent_messages = limit.max(1);
        self
    }

    pub fn with_checkin_poll_seconds(mut self, seconds: u64) -> Self {
        self.checkin_poll_seconds = seconds.max(1);
        self
    }

    pub fn without_checkins(mut self) -> Self {
        self.enable_checkins = false;
        self
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn checkin_poll_interval(&self) -> Duration {
        Duration::from_secs(self.checkin_poll_seconds.max(1))
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `ASSESSOR_DB_PATH` (default: None = in-memory)
    /// - `ASSESSOR_RECENT_MESSAGES` (default: 50)
    /// - `ASSESSOR_CHECKIN_POLL_SECONDS` (default: 60)
    /// - `ASSESSOR_DISABLE_CHECKINS` (default: unset)
    /// - `ASSESSOR_MATCHING_MAX_SEEN` (default: 10000)
    /// - `ASSESSOR_MATCHING_MAX_INTERACTIONS` (default: 500)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ASSESSOR_DB_PATH") {
            if !path.trim().is_empty() {
                config.db_path = Some(path);
            }
        }

        if let Some(limit) = parse_env::<usize>("ASSESSOR_RECENT_MESSAGES") {
            config.recent_messages = limit.max(1);
        }

        if let Some(seconds) = parse_env::<u64>("ASSESSOR_CHECKIN_POLL_SECONDS") {
            config.checkin_poll_seconds = seconds.max(1);
        }

        if std::env::var("ASSESSOR_DISABLE_CHECKINS").is_ok() {
            config.enable_checkins = false;
        }

        if let Some(max_seen) = parse_env::<usize>("ASSESSOR_MATCHING_MAX_SEEN") {
            config.feed.max_seen = max_seen.max(1);
        }

        if let Some(max) = parse_env::<usize>("ASSESSOR_MATCHING_MAX_INTERACTIONS") {
            config.feed.max_interactions = max.max(1);
        }

        config
    }
}

/// Settings for the optional enrichment provider.
#[derive(Clone, Default)]
pub struct EnrichmentConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl std::fmt::Debug for EnrichmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .finish()
    }
}

impl EnrichmentConfig {
    /// Reads `BUILT_IN_FORGE_API_URL`, `BUILT_IN_FORGE_API_KEY` and
    /// `ASSESSOR_ENRICHMENT_MODEL`. Empty values count as unset.
    pub fn from_env() -> Self {
        let config = Self {
            api_url: non_empty_env("BUILT_IN_FORGE_API_URL"),
            api_key: non_empty_env("BUILT_IN_FORGE_API_KEY"),
            model: non_empty_env("ASSESSOR_ENRICHMENT_MODEL"),
        };
        if !config.is_enabled() {
            info_once(
                "enrichment:disabled",
                "BUILT_IN_FORGE_API_KEY not set, profile enrichment disabled",
            );
        }
        config
    }

    /// Enrichment runs only when an API key is configured.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.recent_messages, 50);
        assert_eq!(config.checkin_poll_interval(), Duration::from_secs(60));
        assert!(config.enable_checkins);
        assert_eq!(config.feed.max_seen, 10_000);
        assert_eq!(config.feed.max_interactions, 500);
    }

    #[test]
    fn test_builders_clamp() {
        let config = EngineConfig::default()
            .with_recent_messages(0)
            .with_checkin_poll_seconds(0)
            .without_checkins()
            .with_db_path("/tmp/profiles.db");
        assert_eq!(config.recent_messages, 1);
        assert_eq!(config.checkin_poll_seconds, 1);
        assert!(!config.enable_checkins);
        assert_eq!(config.db_path.as_deref(), Some("/tmp/profiles.db"));
    }

    #[test]
    fn test_enrichment_requires_key() {
        assert!(!EnrichmentConfig::default().is_enabled());
        let config = EnrichmentConfig {
            api_key: Some("k".to_string()),
            ..EnrichmentConfig::default()
        };
        assert!(config.is_enabled());
        assert!(!format!("{:?}", config).contains("\"k\""));
    }
}
