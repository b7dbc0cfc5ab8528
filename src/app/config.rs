use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_ABACATEPAY_API_URL: &str = "https://api.abacatepay.com";
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub abacatepay_api_url: String,
    pub abacatepay_api_key: String,
    pub webhook_secret: String,
    pub gateway_timeout_ms: u64,
    /// Bearer token -> user id.
    pub api_tokens: HashMap<String, String>,
}

/// Shape of the optional TOML file. Every field may also come from the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    abacatepay_api_url: Option<String>,
    abacatepay_api_key: Option<String>,
    webhook_secret: Option<String>,
    gateway_timeout_ms: Option<u64>,
    #[serde(default)]
    api_tokens: HashMap<String, String>,
}

impl Config {
    /// Reads the optional TOML file, applies environment overrides and
    /// validates required settings.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&raw)?
            }
            None => FileConfig::default(),
        };

        Self::resolve(file, |key| env::var(key).ok())
    }

    fn resolve(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let server_port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                reason: format!("`{}` is not a port number", raw),
            })?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let abacatepay_api_url = lookup("ABACATEPAY_API_URL")
            .or(file.abacatepay_api_url)
            .unwrap_or_else(|| DEFAULT_ABACATEPAY_API_URL.to_string());
        url::Url::parse(&abacatepay_api_url).map_err(|e| ConfigError::Invalid {
            key: "ABACATEPAY_API_URL",
            reason: e.to_string(),
        })?;

        let abacatepay_api_key = non_empty(lookup("ABACATEPAY_API_KEY").or(file.abacatepay_api_key))
            .ok_or(ConfigError::Missing("ABACATEPAY_API_KEY"))?;

        let webhook_secret = non_empty(lookup("ABACATEPAY_WEBHOOK_SECRET").or(file.webhook_secret))
            .ok_or(ConfigError::Missing("ABACATEPAY_WEBHOOK_SECRET"))?;

        let gateway_timeout_ms = match lookup("GATEWAY_TIMEOUT_MS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "GATEWAY_TIMEOUT_MS",
                reason: format!("`{}` is not a number of milliseconds", raw),
            })?,
            None => file.gateway_timeout_ms.unwrap_or(DEFAULT_GATEWAY_TIMEOUT_MS),
        };
        if gateway_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "GATEWAY_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let api_tokens = match lookup("PIX_API_TOKENS") {
            Some(raw) => parse_token_list(&raw)?,
            None => file.api_tokens,
        };
        if api_tokens.is_empty() {
            return Err(ConfigError::Missing("PIX_API_TOKENS"));
        }

        Ok(Self {
            server_port,
            abacatepay_api_url,
            abacatepay_api_key,
            webhook_secret,
            gateway_timeout_ms,
            api_tokens,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// Formato: "token1:user1,token2:user2"
fn parse_token_list(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(':') {
            Some((token, user)) if !token.trim().is_empty() && !user.trim().is_empty() => {
                Ok((token.trim().to_string(), user.trim().to_string()))
            }
            _ => Err(ConfigError::Invalid {
                key: "PIX_API_TOKENS",
                reason: format!("expected `token:user`, got `{}`", pair),
            }),
        })
        .collect()
}
