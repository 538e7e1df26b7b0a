//! Source fetchers: one per upstream, plus the cache-aware wrapper that
//! applies the degradation policy around them.
//!
//! | Fetcher | Source | Key scope |
//! |---------|--------|-----------|
//! | [`SustainabilityFetcher`] | FSDN sustainability metrics | region |
//! | [`FarmPracticeFetcher`] | FaST soil nutrients and practices | region |
//! | [`MarketPriceFetcher`] | commodity price index | global |
//! | [`WeatherFetcher`] | current weather | quantized coordinates |

mod farm_practice;
mod market_price;
mod sustainability;
mod weather;

pub use farm_practice::FarmPracticeFetcher;
pub use market_price::MarketPriceFetcher;
pub use sustainability::SustainabilityFetcher;
pub use weather::WeatherFetcher;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::cache::TtlCache;
use crate::degradation::{self, FetchResult};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{FetchError, RequestContext, SourceKey, SourceKind};

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send + 'a>>;

/// Upstream adapter contract.
///
/// A fetcher knows how to derive its cache key from a request context, how
/// to call its upstream once, and what to hand back when that call fails.
/// It never touches the cache itself; see [`CachedFetcher`].
pub trait SourceFetcher: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Cache key for `ctx`, or the context field this source cannot do without.
    fn cache_key(&self, ctx: &RequestContext) -> Result<SourceKey, FetchError>;

    /// Static substitute payload used when `failure` prevented a real one.
    fn fallback(&self, failure: &FetchError) -> Value;

    /// Perform exactly one upstream call and validate the response shape.
    fn fetch<'a>(&'a self, ctx: &'a RequestContext, timeout: Duration) -> FetchFuture<'a>;
}

/// A fetcher bound to the shared cache and the request timeout.
#[derive(Clone)]
pub struct CachedFetcher {
    fetcher: Arc<dyn SourceFetcher>,
    cache: TtlCache,
    timeout: Duration,
}

impl CachedFetcher {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, cache: TtlCache, timeout: Duration) -> Self {
        Self {
            fetcher,
            cache,
            timeout,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.fetcher.kind()
    }

    pub fn cache_key(&self, ctx: &RequestContext) -> Result<SourceKey, FetchError> {
        self.fetcher.cache_key(ctx)
    }

    /// Resolve `key` from the cache or, on a miss, from the upstream.
    ///
    /// Never fails: upstream failures come back as [`FetchStatus::Fallback`]
    /// results and are not cached, so the next call tries the upstream again.
    ///
    /// [`FetchStatus::Fallback`]: crate::FetchStatus::Fallback
    pub async fn resolve(&self, key: &SourceKey, ctx: &RequestContext) -> FetchResult {
        let kind = self.kind();
        if let Some(entry) = self.cache.get(key).await {
            debug!(source = %kind, key = %key, "cache hit");
            return FetchResult::hit(kind, entry.payload);
        }

        debug!(source = %kind, key = %key, "cache miss; calling upstream");
        let attempt = tokio::time::timeout(self.timeout, self.fetcher.fetch(ctx, self.timeout)).await;
        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout {
                timeout_ms: duration_ms(self.timeout),
            }),
        };

        match outcome {
            Ok(payload) => {
                self.cache.put(key.clone(), payload.clone()).await;
                FetchResult::fetched(kind, payload)
            }
            Err(failure) => degradation::degrade(self.fetcher.as_ref(), Some(key), failure),
        }
    }

    /// Derive the key for `ctx` and resolve it; a missing context field
    /// degrades without consulting the cache.
    pub async fn resolve_context(&self, ctx: &RequestContext) -> FetchResult {
        match self.cache_key(ctx) {
            Ok(key) => self.resolve(&key, ctx).await,
            Err(failure) => degradation::degrade(self.fetcher.as_ref(), None, failure),
        }
    }

    pub fn fallback(&self, failure: FetchError) -> FetchResult {
        degradation::degrade(self.fetcher.as_ref(), None, failure)
    }
}

/// Execute `request` and decode a JSON body, mapping every failure mode onto
/// [`FetchError`].
pub(crate) async fn get_json(http: &dyn HttpClient, request: HttpRequest) -> Result<Value, FetchError> {
    let timeout_ms = request.timeout_ms;
    let response = http.execute(request).await.map_err(|error| {
        if error.is_timeout() {
            FetchError::Timeout { timeout_ms }
        } else {
            FetchError::transport(error.message())
        }
    })?;

    if !response.is_success() {
        return Err(FetchError::Status {
            status: response.status,
        });
    }

    response
        .json::<Value>()
        .map_err(|error| FetchError::malformed(format!("body is not JSON: {error}")))
}

/// Check `value` against the response schema `T`.
pub(crate) fn validate<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T, FetchError> {
    T::deserialize(value).map_err(|error| FetchError::malformed(format!("{what}: {error}")))
}

pub(crate) fn require_region(ctx: &RequestContext) -> Result<&str, FetchError> {
    ctx.region()
        .ok_or(FetchError::MissingContext { field: "region" })
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}
