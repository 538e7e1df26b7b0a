//! Static mapping from source kind to upstream endpoint.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{ConfigError, SourceKind};

/// Which part of the request context a source's cache key depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    Region,
    Coordinates,
    Global,
}

/// Registry entry describing one upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub description: &'static str,
    pub key_scope: KeyScope,
    pub endpoint: String,
    pub requires_credential: bool,
}

/// Endpoint templates per source. `{region}` is replaced by the url-encoded
/// region name for path-scoped sources; an endpoint without the placeholder
/// gets the region appended as its last path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    endpoints: BTreeMap<SourceKind, String>,
}

impl SourceRegistry {
    pub const SUSTAINABILITY_URL: &'static str =
        "https://agriculture.ec.europa.eu/api/fsdn/region/{region}";
    pub const FARM_PRACTICE_URL: &'static str =
        "https://fastplatform.eu/api/v1/agricultural-data";
    pub const MARKET_PRICE_URL: &'static str = "https://agridata.ec.europa.eu/api/v1/prices";
    pub const WEATHER_URL: &'static str = "https://api.openweathermap.org/data/2.5/weather";

    pub fn new() -> Self {
        let endpoints = SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, Self::default_endpoint(kind).to_owned()))
            .collect();
        Self { endpoints }
    }

    pub const fn default_endpoint(kind: SourceKind) -> &'static str {
        match kind {
            SourceKind::Sustainability => Self::SUSTAINABILITY_URL,
            SourceKind::FarmPractice => Self::FARM_PRACTICE_URL,
            SourceKind::MarketPrice => Self::MARKET_PRICE_URL,
            SourceKind::Weather => Self::WEATHER_URL,
        }
    }

    pub const fn key_scope(kind: SourceKind) -> KeyScope {
        match kind {
            SourceKind::Sustainability | SourceKind::FarmPractice => KeyScope::Region,
            SourceKind::MarketPrice => KeyScope::Global,
            SourceKind::Weather => KeyScope::Coordinates,
        }
    }

    /// Replace the endpoint for `kind`. Only `http`/`https` URLs are accepted.
    pub fn with_endpoint(
        mut self,
        kind: SourceKind,
        endpoint: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into();
        let trimmed = endpoint.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint {
                source_name: kind.as_str(),
                value: endpoint,
            });
        }
        self.endpoints
            .insert(kind, trimmed.trim_end_matches('/').to_owned());
        Ok(self)
    }

    pub fn endpoint(&self, kind: SourceKind) -> &str {
        self.endpoints
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| Self::default_endpoint(kind))
    }

    /// Endpoint with the url-encoded region as a path segment.
    pub fn region_url(&self, kind: SourceKind, region: &str) -> String {
        let endpoint = self.endpoint(kind);
        let region = urlencoding::encode(region);
        if endpoint.contains("{region}") {
            endpoint.replace("{region}", &region)
        } else {
            format!("{endpoint}/{region}")
        }
    }

    pub fn describe(&self) -> Vec<SourceDescriptor> {
        SourceKind::ALL
            .into_iter()
            .map(|kind| SourceDescriptor {
                kind,
                description: match kind {
                    SourceKind::Sustainability => "Farm Sustainability Data Network metrics",
                    SourceKind::FarmPractice => "FaST platform soil nutrients and practices",
                    SourceKind::MarketPrice => "agricultural commodity price index",
                    SourceKind::Weather => "current weather conditions",
                },
                key_scope: Self::key_scope(kind),
                endpoint: self.endpoint(kind).to_owned(),
                requires_credential: kind == SourceKind::Weather,
            })
            .collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
