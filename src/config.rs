use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_API_BASE_URL: &str = "https://reflect.app/api";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://reflect.app/oauth";
pub const DEFAULT_TOKEN_URL: &str = "https://reflect.app/api/oauth/token";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            access_token: None,
            refresh_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub default_graph_id: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            default_graph_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply `REFLECT_*`
    /// environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Override file values with whatever `lookup` returns for the known
    /// environment keys. Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("REFLECT_CLIENT_ID") {
            self.oauth.client_id = value;
        }
        if let Some(value) = get("REFLECT_CLIENT_SECRET") {
            self.oauth.client_secret = value;
        }
        if let Some(value) = get("REFLECT_REDIRECT_URI") {
            self.oauth.redirect_uri = value;
        }
        if let Some(value) = get("REFLECT_AUTHORIZE_URL") {
            self.oauth.authorize_url = value;
        }
        if let Some(value) = get("REFLECT_TOKEN_URL") {
            self.oauth.token_url = value;
        }
        if let Some(value) = get("REFLECT_ACCESS_TOKEN") {
            self.oauth.access_token = Some(value);
        }
        if let Some(value) = get("REFLECT_REFRESH_TOKEN") {
            self.oauth.refresh_token = Some(value);
        }
        if let Some(value) = get("REFLECT_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = get("REFLECT_DEFAULT_GRAPH_ID") {
            self.api.default_graph_id = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_parsing() {
        let toml_str = r#"
            [oauth]
            client_id = "abc"
            client_secret = "shh"

            [api]
            default_graph_id = "g1"

            [logging]
            level = "debug"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.oauth.client_id, "abc");
        assert_eq!(config.oauth.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.oauth.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api.default_graph_id.as_deref(), Some("g1"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.oauth.client_id.is_empty());
        assert!(config.oauth.access_token.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: Config = toml::from_str("[api]\nbase_url = \"http://file\"").unwrap();
        let env: HashMap<&str, &str> = [
            ("REFLECT_API_BASE_URL", "http://env"),
            ("REFLECT_ACCESS_TOKEN", "t1"),
            ("REFLECT_DEFAULT_GRAPH_ID", ""),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://env");
        assert_eq!(config.oauth.access_token.as_deref(), Some("t1"));
        assert!(config.api.default_graph_id.is_none());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config = Config::load("/nonexistent/reflect.toml").unwrap();
        assert!(!config.api.base_url.is_empty());
    }
}
