// Adapter configuration: optional config file layered under MI6_* environment variables
use std::path::Path;
use std::time::Duration;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::models::RetryPolicy;

pub const DEFAULT_ENDPOINT: &str = "https://apis-dev.intel.com/mi6/ui/v1/conversations";
pub const DEFAULT_MODEL: &str = "azure.openai.gpt.4";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_USE_CASE: &str = "generic";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const ENV_PREFIX: &str = "MI6";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mi6Config {
    pub auth_token: String,
    pub model: String,
    pub temperature: f32,
    pub use_case: String,
    pub tags: Vec<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Send `tags` with each request. Off by default: the gateway integration
    /// has always posted an empty tag list.
    pub forward_tags: bool,
    pub max_retry_attempts: u32,
    pub min_wait_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for Mi6Config {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            auth_token: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            use_case: DEFAULT_USE_CASE.to_string(),
            tags: Vec::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            forward_tags: false,
            max_retry_attempts: retry.max_attempts,
            min_wait_secs: retry.min_wait.as_secs(),
            max_wait_secs: retry.max_wait.as_secs(),
        }
    }
}

impl Mi6Config {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ..Self::default()
        }
    }

    /// Load configuration from an optional file, then override with `MI6_*` env vars
    /// (e.g. `MI6_AUTH_TOKEN`, `MI6_MODEL`, `MI6_TEMPERATURE`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("tags"),
            )
            .build()?;

        let config: Mi6Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth_token.trim().is_empty() {
            bail!("auth_token must be set (MI6_AUTH_TOKEN)");
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            bail!("temperature must be within [0, 1], got {}", self.temperature);
        }
        if self.max_retry_attempts == 0 {
            bail!("max_retry_attempts must be at least 1");
        }
        if self.min_wait_secs > self.max_wait_secs {
            bail!(
                "min_wait_secs ({}) must not exceed max_wait_secs ({})",
                self.min_wait_secs,
                self.max_wait_secs
            );
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_retry_attempts)
            .with_wait_bounds(
                Duration::from_secs(self.min_wait_secs),
                Duration::from_secs(self.max_wait_secs),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in ["MI6_AUTH_TOKEN", "MI6_TEMPERATURE", "MI6_TAGS", "MI6_MODEL"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let config = Mi6Config::new("token");
        assert_eq!(config.model, "azure.openai.gpt.4");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.use_case, "generic");
        assert!(config.tags.is_empty());
        assert!(!config.forward_tags);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Mi6Config::default().validate().is_err());

        let mut config = Mi6Config::new("token");
        config.temperature = 1.5;
        assert!(config.validate().is_err());

        let mut config = Mi6Config::new("token");
        config.min_wait_secs = 400;
        assert!(config.validate().is_err());

        let mut config = Mi6Config::new("token");
        config.max_retry_attempts = 0;
        assert!(config.validate().is_err());
    }

    fn write_config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
auth_token = "file-token"
model = "azure.openai.gpt.3.5"
temperature = 0.2
tags = ["agent", "test"]
max_retry_attempts = 2
"#
        )
        .unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let file = write_config_file();

        let config = Mi6Config::load(Some(file.path())).unwrap();
        assert_eq!(config.auth_token, "file-token");
        assert_eq!(config.model, "azure.openai.gpt.3.5");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.tags, vec!["agent".to_string(), "test".to_string()]);
        assert_eq!(config.max_retry_attempts, 2);
        assert_eq!(config.use_case, "generic");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let file = write_config_file();
        std::env::set_var("MI6_AUTH_TOKEN", "env-token");
        std::env::set_var("MI6_TEMPERATURE", "0.9");
        std::env::set_var("MI6_TAGS", "a,b");

        let config = Mi6Config::load(Some(file.path()));
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.auth_token, "env-token");
        assert_eq!(config.temperature, 0.9);
        assert_eq!(config.tags, vec!["a".to_string(), "b".to_string()]);
        // untouched file values survive
        assert_eq!(config.model, "azure.openai.gpt.3.5");
        assert_eq!(config.max_retry_attempts, 2);
    }

    #[test]
    #[serial]
    fn test_load_from_env_only() {
        clear_env();
        std::env::set_var("MI6_AUTH_TOKEN", "env-token");
        std::env::set_var("MI6_MODEL", "azure.openai.gpt.3.5");

        let config = Mi6Config::load(None);
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.auth_token, "env-token");
        assert_eq!(config.model, "azure.openai.gpt.3.5");
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    #[serial]
    fn test_load_without_token_fails() {
        clear_env();
        assert!(Mi6Config::load(None).is_err());
    }

    #[test]
    #[serial]
    fn test_load_missing_file_fails() {
        assert!(Mi6Config::load(Some(Path::new("/nonexistent/mi6.toml"))).is_err());
    }
}
