//! Environment-driven configuration.
//!
//! # Environment Variables
//!
//! | Setting | Primary Env Var | Fallback Env Var | Default |
//! |---------|-----------------|------------------|---------|
//! | Weather API key | `AGRILINK_WEATHER_API_KEY` | `OPENWEATHER_API_KEY` | - |
//! | Request timeout | `AGRILINK_REQUEST_TIMEOUT_MS` | - | `3000` |
//! | Cache TTL | `AGRILINK_CACHE_TTL_SECS` | - | `86400` |
//! | Endpoint override | `AGRILINK_<SOURCE>_URL` | - | registry default |
//! | LLM API key | `AGRILINK_LLM_API_KEY` | `OPENAI_API_KEY` | - |
//! | LLM base URL | `AGRILINK_LLM_BASE_URL` | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
//! | LLM model | `AGRILINK_LLM_MODEL` | `OPENAI_MODEL` | `gpt-4o-mini` |

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::{ConfigError, SourceKind, SourceRegistry};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3_000);
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Settings for the OpenAI-compatible text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for TextGenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from(DEFAULT_LLM_BASE_URL),
            model: String::from(DEFAULT_LLM_MODEL),
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgriConfig {
    pub weather_api_key: Option<String>,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub registry: SourceRegistry,
    pub text_generation: TextGenerationConfig,
}

impl Default for AgriConfig {
    fn default() -> Self {
        Self {
            weather_api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_ttl: DEFAULT_TTL,
            registry: SourceRegistry::new(),
            text_generation: TextGenerationConfig::default(),
        }
    }
}

impl AgriConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |primary: &str, fallback: Option<&str>| {
            lookup(primary)
                .or_else(|| fallback.and_then(|name| lookup(name)))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let request_timeout = match get("AGRILINK_REQUEST_TIMEOUT_MS", None) {
            Some(raw) => Duration::from_millis(parse_positive("AGRILINK_REQUEST_TIMEOUT_MS", &raw)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };
        let cache_ttl = match get("AGRILINK_CACHE_TTL_SECS", None) {
            Some(raw) => Duration::from_secs(parse_positive("AGRILINK_CACHE_TTL_SECS", &raw)?),
            None => DEFAULT_TTL,
        };

        let mut registry = SourceRegistry::new();
        for kind in SourceKind::ALL {
            if let Some(url) = get(&format!("AGRILINK_{}_URL", kind.env_suffix()), None) {
                registry = registry.with_endpoint(kind, url)?;
            }
        }

        let text_generation = TextGenerationConfig {
            api_key: get("AGRILINK_LLM_API_KEY", Some("OPENAI_API_KEY")),
            base_url: get("AGRILINK_LLM_BASE_URL", Some("OPENAI_BASE_URL"))
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| String::from(DEFAULT_LLM_BASE_URL)),
            model: get("AGRILINK_LLM_MODEL", Some("OPENAI_MODEL"))
                .unwrap_or_else(|| String::from(DEFAULT_LLM_MODEL)),
        };

        Ok(Self {
            weather_api_key: get("AGRILINK_WEATHER_API_KEY", Some("OPENWEATHER_API_KEY")),
            request_timeout,
            cache_ttl,
            registry,
            text_generation,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_weather_api_key(mut self, key: impl Into<String>) -> Self {
        self.weather_api_key = Some(key.into());
        self
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_owned(),
        }),
    }
}
