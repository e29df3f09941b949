//! CLI configuration
use crate::error::{CliError, Result};
use harmony_client::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, read from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "harmony.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendSettings,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub url: String,
}

impl AppConfig {
    /// Load configuration from file and environment.
    ///
    /// An explicit `path` must exist; otherwise `harmony.toml` is read if
    /// present. `HARMONY_` environment variables override both, with `__`
    /// between nested keys (`HARMONY_PIPELINE__RETRY__MAX_ATTEMPTS=5`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("HARMONY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = &self.backend.url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CliError::Config(format!(
                "Backend URL must start with http:// or https:// (got {:?})",
                url
            )));
        }

        if self.pipeline.timeout_secs == 0 {
            return Err(CliError::Config(
                "pipeline.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.pipeline.retry.enabled && self.pipeline.retry.max_attempts == 0 {
            return Err(CliError::Config(
                "pipeline.retry.max_attempts must be greater than zero (or disable retry)"
                    .to_string(),
            ));
        }

        if self.pipeline.cache.enabled && self.pipeline.cache.capacity == 0 {
            return Err(CliError::Config(
                "pipeline.cache.capacity must be greater than zero (or disable the cache)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            pipeline: PipelineConfig::default(),
        }
    }
}

// Default values
fn default_backend() -> BackendSettings {
    BackendSettings {
        url: default_backend_url(),
    }
}

fn default_backend_url() -> String {
    "http://localhost:3000".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert_eq!(config.backend.url, "http://localhost:3000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backend]
url = "https://api.example.com"

[pipeline]
timeout_secs = 10

[pipeline.retry]
max_attempts = 5
max_jitter_ms = 0

[pipeline.auth]
capability_paths = ["/spotify/"]
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.backend.url, "https://api.example.com");
        assert_eq!(config.pipeline.timeout_secs, 10);
        assert_eq!(config.pipeline.retry.max_attempts, 5);
        assert_eq!(config.pipeline.retry.base_delay_ms, 1000);
        assert_eq!(config.pipeline.auth.capability_paths, vec!["/spotify/"]);
        assert!(config.pipeline.cache.enabled);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/harmony.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.backend.url = "localhost:3000".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.retry.max_attempts = 0;
        assert!(config.validate().is_err());
        config.pipeline.retry.enabled = false;
        assert!(config.validate().is_ok());
    }
}
