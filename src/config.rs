//! Configuration for the chat relay.
//!
//! Values start from the defaults below and are overridden by environment
//! variables (optionally loaded from a `.env` file) in [`RelayConfig::from_env`].

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default overall limit for one model request, matching the `OpenAI` client libraries.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Default system instruction placed ahead of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Provide clear, concise, and accurate responses. Be friendly and professional in your interactions.";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// An environment variable could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// Raw value found in the environment.
        value: String,
    },
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Model API settings.
    pub llm: LlmConfig,
}

impl RelayConfig {
    /// Build the configuration from defaults and environment overrides.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or the result fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or the result fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parse_var(&lookup, "PORT")? {
            config.server.port = port;
        }
        if let Some(mode) = lookup("CHAT_RELAY_ENV").or_else(|| lookup("NODE_ENV")) {
            config.server.environment = RuntimeMode::from_env_value(&mode);
        }
        if let Some(path) = lookup("CHAT_RELAY_DB_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            config.llm.api_key = key;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            config.llm.base_url = base_url;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.llm.model = model;
        }
        if let Some(max_tokens) = parse_var(&lookup, "OPENAI_MAX_TOKENS")? {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = parse_var(&lookup, "OPENAI_TEMPERATURE")? {
            config.llm.temperature = temperature;
        }
        if let Some(timeout) = parse_var(&lookup, "OPENAI_TIMEOUT_SECS")? {
            config.llm.request_timeout_secs = timeout;
        }
        if let Some(prompt) = lookup("CHAT_RELAY_SYSTEM_PROMPT") {
            config.llm.system_prompt = prompt;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        if self.storage.sqlite_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.sqlite_path must not be empty".to_string(),
            ));
        }

        if self.storage.messages_table.is_empty()
            || !self
                .storage
                .messages_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid(format!(
                "storage.messages_table {:?} is not a plain identifier",
                self.storage.messages_table
            )));
        }

        Url::parse(&self.llm.base_url)?;

        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Invalid("llm.max_tokens must be > 0".to_string()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(
                "llm.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.llm.system_prompt.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "llm.system_prompt must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { name, value })
        })
        .transpose()
}

/// Runtime mode controlling how much failure detail reaches callers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Generic error messages only.
    #[default]
    Production,
    /// Internal failure details are included in 500 responses.
    Development,
}

impl RuntimeMode {
    /// Interpret an environment value; anything but `development` is production.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Whether internal error details may be shown to callers.
    #[must_use]
    pub const fn exposes_details(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
    /// Runtime mode.
    pub environment: RuntimeMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: RuntimeMode::Production,
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Messages table name.
    pub messages_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("messages.db"),
            messages_table: "messages".to_string(),
        }
    }
}

/// Model API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an `OpenAI`-compatible API.
    pub base_url: String,
    /// Bearer credential.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Completion model name.
    pub model: String,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Overall limit for one completion request, in seconds.
    pub request_timeout_secs: u64,
    /// Fixed leading system instruction.
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = RelayConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.environment, RuntimeMode::Production);
        assert_eq!(config.storage.sqlite_path, PathBuf::from("messages.db"));
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.llm.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn request_timeout_is_configurable_but_not_zero() {
        let config =
            RelayConfig::from_lookup(lookup_from(&[("OPENAI_TIMEOUT_SECS", "900")])).unwrap();
        assert_eq!(config.llm.request_timeout_secs, 900);

        let err = RelayConfig::from_lookup(lookup_from(&[("OPENAI_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn environment_overrides_apply() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("PORT", "3001"),
            ("NODE_ENV", "development"),
            ("CHAT_RELAY_DB_PATH", "/tmp/chat.db"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "0.2"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 3001);
        assert!(config.server.environment.exposes_details());
        assert_eq!(config.storage.sqlite_path, PathBuf::from("/tmp/chat.db"));
        assert_eq!(config.llm.api_key, "sk-test");
        assert!((config.llm.temperature - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn relay_env_takes_precedence_over_node_env() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("CHAT_RELAY_ENV", "production"),
            ("NODE_ENV", "development"),
        ]))
        .unwrap();
        assert!(!config.server.environment.exposes_details());
    }

    #[test]
    fn unparseable_port_is_rejected() {
        let err = RelayConfig::from_lookup(lookup_from(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "PORT", .. }));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut too_hot = RelayConfig::default();
        too_hot.llm.temperature = 3.5;
        assert!(too_hot.validate().is_err());

        let mut bad_url = RelayConfig::default();
        bad_url.llm.base_url = "not a url".to_string();
        assert!(matches!(bad_url.validate(), Err(ConfigError::Url(_))));

        let mut bad_table = RelayConfig::default();
        bad_table.storage.messages_table = "messages; DROP".to_string();
        assert!(bad_table.validate().is_err());

        let mut blank_prompt = RelayConfig::default();
        blank_prompt.llm.system_prompt = "   ".to_string();
        assert!(blank_prompt.validate().is_err());
    }
}
