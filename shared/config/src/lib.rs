pub mod feature_toggles;

use feature_toggles::FeatureToggles;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Top-level configuration for the server and the admin CLI.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
    pub auth: AuthConfig,
    pub feature_toggles: FeatureToggles,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub env_mode: String,
    /// Master secret for signing session cookies
    pub secret_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

/// Settings for the external chat completion endpoint.
///
/// Passed explicitly into the chat service; `api_key == None` disables the
/// external path and every question is answered by the local responder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Optional JSON file overriding the built-in local rule table
    pub rules_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            env_mode: "development".to_string(),
            secret_key: "kgviz-insecure-dev-secret".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://kgviz.db?mode=rwc".to_string(),
            max_connections: 5,
            connect_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Single-connection in-memory database, used by tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            connect_timeout_seconds: 5,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1/".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 30,
            max_tokens: 1500,
            temperature: 0.3,
            rules_path: None,
        }
    }
}

impl ChatConfig {
    pub fn external_enabled(&self) -> bool {
        self.api_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false)
    }

    /// Completion endpoint derived from `base_url`, tolerant of a trailing slash.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { bcrypt_cost: 12 }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unset or
    /// unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parse_or = |key: &str, default: u64| -> u64 {
            get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            host: get("SERVER_HOST").unwrap_or(server_defaults.host),
            port: get("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(server_defaults.port),
            env_mode: get("ENVIRONMENT").unwrap_or(server_defaults.env_mode),
            secret_key: get("SECRET_KEY").unwrap_or(server_defaults.secret_key),
        };

        let db_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            database_url: get("DATABASE_URL").unwrap_or(db_defaults.database_url),
            max_connections: parse_or("DB_MAX_CONNECTIONS", db_defaults.max_connections as u64) as u32,
            connect_timeout_seconds: parse_or("DB_CONNECT_TIMEOUT", db_defaults.connect_timeout_seconds),
        };

        let chat_defaults = ChatConfig::default();
        let chat = ChatConfig {
            api_key: get("CHATGPT_API_KEY"),
            base_url: get("CHATGPT_BASE_URL").unwrap_or(chat_defaults.base_url),
            model: get("CHATGPT_MODEL").unwrap_or(chat_defaults.model),
            timeout_seconds: parse_or("CHATGPT_TIMEOUT_SECS", chat_defaults.timeout_seconds),
            max_tokens: parse_or("CHATGPT_MAX_TOKENS", chat_defaults.max_tokens as u64) as u32,
            temperature: get("CHATGPT_TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(chat_defaults.temperature),
            rules_path: get("CHAT_RULES_PATH").map(PathBuf::from),
        };

        let auth = AuthConfig {
            bcrypt_cost: parse_or("BCRYPT_COST", AuthConfig::default().bcrypt_cost as u64) as u32,
        };

        let feature_toggles = FeatureToggles::from_path(get("FEATURE_TOGGLES_PATH"));

        Self {
            server,
            database,
            chat,
            auth,
            feature_toggles,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: format!("{} is outside 4..=31", self.auth.bcrypt_cost),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.chat.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "CHATGPT_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.env_mode.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.chat.external_enabled());
        assert_eq!(config.auth.bcrypt_cost, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_values_are_read_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SERVER_PORT", "9100"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("CHATGPT_API_KEY", "sk-test"),
            ("CHATGPT_BASE_URL", "http://localhost:9999/v1/"),
            ("CHATGPT_TIMEOUT_SECS", "5"),
            ("BCRYPT_COST", "4"),
        ]));

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.database_url, "sqlite::memory:");
        assert!(config.chat.external_enabled());
        assert_eq!(config.chat.timeout_seconds, 5);
        assert_eq!(
            config.chat.completions_url(),
            "http://localhost:9999/v1/chat/completions"
        );
        assert_eq!(config.auth.bcrypt_cost, 4);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SERVER_PORT", "not-a-port"),
            ("CHATGPT_API_KEY", "   "),
        ]));
        assert_eq!(config.server.port, 8000);
        assert!(!config.chat.external_enabled());
    }

    #[test]
    fn test_validate_rejects_bad_bcrypt_cost() {
        let config = AppConfig::from_lookup(lookup_from(&[("BCRYPT_COST", "2")]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "BCRYPT_COST", .. })
        ));
    }
}
