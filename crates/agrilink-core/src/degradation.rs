//! Fallback-on-failure policy shared by every source.
//!
//! A fetcher reports failures as `Err(FetchError)`. This module is the one
//! place where such a failure becomes a [`FetchResult`] carrying the source's
//! static fallback payload, so callers always receive a structurally valid
//! answer.

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::fetchers::{
    FarmPracticeFetcher, MarketPriceFetcher, SourceFetcher, SustainabilityFetcher, WeatherFetcher,
};
use crate::{FetchError, SourceKey, SourceKind};

/// How a payload was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Served from a fresh cache entry.
    Hit,
    /// Fetched from the upstream just now and cached.
    Fetched,
    /// Upstream failed; payload is the source's static fallback.
    Fallback,
}

/// Outcome of resolving one source for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub source: SourceKind,
    pub status: FetchStatus,
    pub payload: Value,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_failure"
    )]
    pub failure: Option<FetchError>,
}

impl FetchResult {
    pub fn hit(source: SourceKind, payload: Value) -> Self {
        Self {
            source,
            status: FetchStatus::Hit,
            payload,
            failure: None,
        }
    }

    pub fn fetched(source: SourceKind, payload: Value) -> Self {
        Self {
            source,
            status: FetchStatus::Fetched,
            payload,
            failure: None,
        }
    }

    pub fn fallback(source: SourceKind, payload: Value, failure: FetchError) -> Self {
        Self {
            source,
            status: FetchStatus::Fallback,
            payload,
            failure: Some(failure),
        }
    }

    pub const fn is_fallback(&self) -> bool {
        matches!(self.status, FetchStatus::Fallback)
    }
}

/// Turn a failed fetch into the source's fallback result.
pub fn degrade(fetcher: &dyn SourceFetcher, key: Option<&SourceKey>, failure: FetchError) -> FetchResult {
    let source = fetcher.kind();
    warn!(
        source = %source,
        key = key.map(SourceKey::as_str).unwrap_or("-"),
        code = failure.code(),
        reason = %failure,
        "source degraded to fallback payload"
    );
    FetchResult::fallback(source, fetcher.fallback(&failure), failure)
}

/// Fallback payload for `source` without a fetcher instance at hand.
pub fn static_fallback(source: SourceKind, failure: &FetchError) -> Value {
    match source {
        SourceKind::Sustainability => SustainabilityFetcher::fallback_payload(),
        SourceKind::FarmPractice => FarmPracticeFetcher::fallback_payload(),
        SourceKind::MarketPrice => MarketPriceFetcher::fallback_payload(),
        SourceKind::Weather => WeatherFetcher::fallback_payload(failure),
    }
}

fn serialize_failure<S>(failure: &Option<FetchError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match failure {
        Some(failure) => serializer.serialize_str(&failure.to_string()),
        None => serializer.serialize_none(),
    }
}
