//! Pipeline configuration
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for every pipeline stage.
///
/// Each stage can be switched off on its own; turning one off never changes
/// how the others behave.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Bound on a single dispatch (connect + receive)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached responses
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path substrings that require the capability credential
    #[serde(default = "default_capability_paths")]
    pub capability_paths: Vec<String>,

    /// A token expiring sooner than this is treated as expired
    #[serde(default = "default_token_expiry_buffer_secs")]
    pub token_expiry_buffer_secs: u64,

    /// Backend endpoint that issues fresh capability tokens
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Retries after the first attempt
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the random delay added to each backoff
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl AuthSettings {
    pub fn token_expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.token_expiry_buffer_secs)
    }

    /// Whether `path` is on the capability allowlist.
    pub fn requires_capability(&self, path: &str) -> bool {
        self.capability_paths
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            cache: CacheSettings::default(),
            auth: AuthSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_cache_ttl_secs(),
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            capability_paths: default_capability_paths(),
            token_expiry_buffer_secs: default_token_expiry_buffer_secs(),
            refresh_path: default_refresh_path(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

// Default values
fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    256
}

fn default_capability_paths() -> Vec<String> {
    ["/spotify/", "/playlists/", "/me/top", "/audio-features", "/artists"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_token_expiry_buffer_secs() -> u64 {
    300
}

fn default_refresh_path() -> String {
    "/api/auth/capability/refresh".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.auth.token_expiry_buffer(), Duration::from_secs(300));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay(), Duration::from_secs(1));
        assert_eq!(config.retry.max_jitter(), Duration::from_millis(500));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"retry": {"enabled": false}}"#).unwrap();
        assert!(!config.retry.enabled);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.cache.enabled);
    }

    #[test]
    fn capability_allowlist_matches_substrings() {
        let auth = AuthSettings::default();
        assert!(auth.requires_capability("/api/spotify/playlists/abc/tracks"));
        assert!(auth.requires_capability("/api/me/top/artists"));
        assert!(!auth.requires_capability("/api/me"));
        assert!(!auth.requires_capability("/api/info"));
    }
}
