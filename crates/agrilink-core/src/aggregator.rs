use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::clock::{Clock, SystemClock};
use crate::config::AgriConfig;
use crate::degradation::{self, FetchResult, FetchStatus};
use crate::fetchers::{
    CachedFetcher, FarmPracticeFetcher, MarketPriceFetcher, SourceFetcher, SustainabilityFetcher,
    WeatherFetcher,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::models::{FarmPractices, MarketPrices, SustainabilityMetrics, WeatherReport};
use crate::{ConfigError, FetchError, RequestContext, SourceKey, SourceKind};

/// Per-source results of one aggregation call, keyed by source kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResponseBundle {
    results: BTreeMap<SourceKind, FetchResult>,
}

impl ResponseBundle {
    pub fn get(&self, source: SourceKind) -> Option<&FetchResult> {
        self.results.get(&source)
    }

    pub fn payload(&self, source: SourceKind) -> Option<&Value> {
        self.get(source).map(|result| &result.payload)
    }

    pub fn status(&self, source: SourceKind) -> Option<FetchStatus> {
        self.get(source).map(|result| result.status)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn sources(&self) -> Vec<SourceKind> {
        self.results.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FetchResult> {
        self.results.values()
    }

    /// Sources whose payload is a fallback.
    pub fn degraded_sources(&self) -> Vec<SourceKind> {
        self.iter()
            .filter(|result| result.is_fallback())
            .map(|result| result.source)
            .collect()
    }

    pub fn count(&self, status: FetchStatus) -> usize {
        self.iter().filter(|result| result.status == status).count()
    }

    pub fn sustainability(&self) -> Option<SustainabilityMetrics> {
        self.typed(SourceKind::Sustainability)
    }

    pub fn farm_practices(&self) -> Option<FarmPractices> {
        self.typed(SourceKind::FarmPractice)
    }

    pub fn market_prices(&self) -> Option<MarketPrices> {
        self.typed(SourceKind::MarketPrice)
    }

    /// `None` when weather was not requested or degraded to its null fallback.
    pub fn weather(&self) -> Option<WeatherReport> {
        self.typed(SourceKind::Weather)
    }

    fn typed<T: serde::de::DeserializeOwned>(&self, source: SourceKind) -> Option<T> {
        self.payload(source)
            .and_then(|payload| T::deserialize(payload).ok())
    }

    fn insert(&mut self, result: FetchResult) {
        self.results.insert(result.source, result);
    }
}

/// Fans requests out to the registered fetchers and merges their results.
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct Aggregator {
    fetchers: BTreeMap<SourceKind, CachedFetcher>,
    cache: TtlCache,
}

impl Aggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::new()
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Source kinds with a registered fetcher.
    pub fn sources(&self) -> Vec<SourceKind> {
        self.fetchers.keys().copied().collect()
    }

    pub fn cache_key(&self, source: SourceKind, ctx: &RequestContext) -> Result<SourceKey, FetchError> {
        match self.fetchers.get(&source) {
            Some(fetcher) => fetcher.cache_key(ctx),
            None => Err(not_registered(source)),
        }
    }

    /// Resolve a single source for an explicit key.
    pub async fn resolve(&self, source: SourceKind, key: &SourceKey, ctx: &RequestContext) -> FetchResult {
        match self.fetchers.get(&source) {
            Some(fetcher) => fetcher.resolve(key, ctx).await,
            None => unregistered_fallback(source),
        }
    }

    /// Resolve every requested source concurrently and wait for all of them.
    ///
    /// The bundle holds exactly one result per distinct requested source.
    /// Failures never escape: they show up as `Fallback` results. If the
    /// returned future is dropped early, fetches already spawned run to
    /// completion in the background and may still populate the cache.
    pub async fn aggregate(&self, ctx: &RequestContext, sources: &[SourceKind]) -> ResponseBundle {
        let started = Instant::now();
        let requested: BTreeSet<SourceKind> = sources.iter().copied().collect();
        let ctx = Arc::new(ctx.clone());

        let mut bundle = ResponseBundle::default();
        let mut in_flight = Vec::with_capacity(requested.len());
        for source in requested {
            let Some(fetcher) = self.fetchers.get(&source).cloned() else {
                bundle.insert(unregistered_fallback(source));
                continue;
            };
            let ctx = Arc::clone(&ctx);
            let handle = tokio::spawn(async move { fetcher.resolve_context(&ctx).await });
            in_flight.push((source, handle));
        }

        for (source, handle) in in_flight {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => match self.fetchers.get(&source) {
                    Some(fetcher) => fetcher.fallback(FetchError::Internal {
                        message: format!("fetch task ended abnormally: {join_error}"),
                    }),
                    None => unregistered_fallback(source),
                },
            };
            bundle.insert(result);
        }

        info!(
            region = ctx.region().unwrap_or("-"),
            sources = bundle.len(),
            hits = bundle.count(FetchStatus::Hit),
            fetched = bundle.count(FetchStatus::Fetched),
            fallbacks = bundle.count(FetchStatus::Fallback),
            latency_ms = started.elapsed().as_millis() as u64,
            "aggregation complete"
        );
        bundle
    }

    /// Aggregate every registered source.
    pub async fn aggregate_all(&self, ctx: &RequestContext) -> ResponseBundle {
        self.aggregate(ctx, &self.sources()).await
    }
}

fn not_registered(source: SourceKind) -> FetchError {
    FetchError::Configuration {
        message: format!("source '{source}' is not enabled"),
    }
}

fn unregistered_fallback(source: SourceKind) -> FetchResult {
    let failure = not_registered(source);
    warn!(source = %source, "requested source is not enabled; using fallback payload");
    let payload = degradation::static_fallback(source, &failure);
    FetchResult::fallback(source, payload, failure)
}

/// Builder wiring fetchers, transport, cache and clock into an [`Aggregator`].
///
/// # Example
///
/// ```rust,ignore
/// use agrilink_core::{AgriConfig, Aggregator, RequestContext, SourceKind};
///
/// let aggregator = Aggregator::builder()
///     .with_config(AgriConfig::from_env()?)
///     .build()?;
/// let bundle = aggregator
///     .aggregate(&RequestContext::for_region("Bavaria"), &SourceKind::ALL)
///     .await;
/// ```
pub struct AggregatorBuilder {
    config: AgriConfig,
    http: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    enabled: BTreeSet<SourceKind>,
    custom: BTreeMap<SourceKind, Arc<dyn SourceFetcher>>,
    require_credentials: bool,
}

impl Default for AggregatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregatorBuilder {
    /// All four sources enabled, default configuration, reqwest transport.
    pub fn new() -> Self {
        Self {
            config: AgriConfig::default(),
            http: None,
            clock: None,
            enabled: SourceKind::ALL.into_iter().collect(),
            custom: BTreeMap::new(),
            require_credentials: true,
        }
    }

    pub fn with_config(mut self, config: AgriConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enable exactly `sources`.
    pub fn with_sources(mut self, sources: &[SourceKind]) -> Self {
        self.enabled = sources.iter().copied().collect();
        self
    }

    pub fn with_source_enabled(mut self, source: SourceKind, enabled: bool) -> Self {
        if enabled {
            self.enabled.insert(source);
        } else {
            self.enabled.remove(&source);
        }
        self
    }

    /// When `false`, a missing weather key is no longer a build error; the
    /// weather source then degrades with a `Configuration` failure per call.
    pub fn require_credentials(mut self, required: bool) -> Self {
        self.require_credentials = required;
        self
    }

    /// Replace the built-in fetcher for `fetcher.kind()` and enable it.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        let kind = fetcher.kind();
        self.enabled.insert(kind);
        self.custom.insert(kind, fetcher);
        self
    }

    /// Wire the enabled sources.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingCredential`] when the built-in weather fetcher is
    /// enabled without an API key and credentials are required.
    pub fn build(self) -> Result<Aggregator, ConfigError> {
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = TtlCache::with_clock(self.config.cache_ttl, clock);
        let registry = &self.config.registry;

        let mut fetchers = BTreeMap::new();
        for kind in self.enabled {
            let fetcher: Arc<dyn SourceFetcher> = match self.custom.get(&kind) {
                Some(custom) => Arc::clone(custom),
                None => match kind {
                    SourceKind::Sustainability => {
                        Arc::new(SustainabilityFetcher::new(Arc::clone(&http), registry))
                    }
                    SourceKind::FarmPractice => {
                        Arc::new(FarmPracticeFetcher::new(Arc::clone(&http), registry))
                    }
                    SourceKind::MarketPrice => {
                        Arc::new(MarketPriceFetcher::new(Arc::clone(&http), registry))
                    }
                    SourceKind::Weather => {
                        let api_key = self.config.weather_api_key.clone();
                        if api_key.is_none() && self.require_credentials {
                            return Err(ConfigError::MissingCredential {
                                source_name: SourceKind::Weather.as_str(),
                                variable: "AGRILINK_WEATHER_API_KEY",
                            });
                        }
                        Arc::new(WeatherFetcher::new(Arc::clone(&http), registry, api_key))
                    }
                },
            };
            fetchers.insert(
                kind,
                CachedFetcher::new(fetcher, cache.clone(), self.config.request_timeout),
            );
        }

        Ok(Aggregator { fetchers, cache })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{OfflineHttpClient, ScriptedHttpClient};
    use crate::{Coordinates, SourceRegistry};

    #[test]
    fn weather_without_credential_fails_at_build_time() {
        let error = Aggregator::builder()
            .with_http_client(Arc::new(OfflineHttpClient))
            .build()
            .err()
            .expect("missing key must be rejected");

        assert_eq!(
            error,
            ConfigError::MissingCredential {
                source_name: "weather",
                variable: "AGRILINK_WEATHER_API_KEY",
            }
        );
    }

    #[test]
    fn disabling_weather_lifts_the_credential_requirement() {
        let aggregator = Aggregator::builder()
            .with_http_client(Arc::new(OfflineHttpClient))
            .with_source_enabled(SourceKind::Weather, false)
            .build()
            .expect("no weather, no key needed");

        assert_eq!(
            aggregator.sources(),
            vec![
                SourceKind::Sustainability,
                SourceKind::FarmPractice,
                SourceKind::MarketPrice
            ]
        );
    }

    #[tokio::test]
    async fn optional_credentials_degrade_weather_per_call() {
        let http = Arc::new(ScriptedHttpClient::new());
        let aggregator = Aggregator::builder()
            .with_http_client(http.clone())
            .with_sources(&[SourceKind::Weather])
            .require_credentials(false)
            .build()
            .expect("credential check skipped");

        let ctx = RequestContext::for_coordinates(Coordinates::new(43.77, 11.25).expect("valid"));
        let bundle = aggregator.aggregate(&ctx, &[SourceKind::Weather]).await;

        let result = bundle.get(SourceKind::Weather).expect("entry present");
        assert_eq!(result.status, FetchStatus::Fallback);
        assert!(matches!(result.failure, Some(FetchError::Configuration { .. })));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn resolve_uses_the_given_key() {
        let http = Arc::new(ScriptedHttpClient::new().respond(
            SourceRegistry::MARKET_PRICE_URL,
            200,
            r#"{"Oats":{"price":190,"unit":"EUR/tonne"}}"#,
        ));
        let aggregator = Aggregator::builder()
            .with_http_client(http.clone())
            .with_sources(&[SourceKind::MarketPrice])
            .build()
            .expect("valid builder");
        let ctx = RequestContext::new();
        let key = aggregator
            .cache_key(SourceKind::MarketPrice, &ctx)
            .expect("registered source");

        let first = aggregator.resolve(SourceKind::MarketPrice, &key, &ctx).await;
        let second = aggregator.resolve(SourceKind::MarketPrice, &key, &ctx).await;

        assert_eq!(key, SourceKey::global(SourceKind::MarketPrice));
        assert_eq!(first.status, FetchStatus::Fetched);
        assert_eq!(second.status, FetchStatus::Hit);
        assert!(aggregator.cache().get(&key).await.is_some());
        assert_eq!(http.request_count(SourceRegistry::MARKET_PRICE_URL), 1);
    }

    #[tokio::test]
    async fn resolve_on_unregistered_source_falls_back() {
        let http = Arc::new(ScriptedHttpClient::new());
        let aggregator = Aggregator::builder()
            .with_http_client(http.clone())
            .with_sources(&[SourceKind::MarketPrice])
            .build()
            .expect("valid builder");
        let ctx = RequestContext::for_region("Tuscany");
        let key = SourceKey::region(SourceKind::FarmPractice, "Tuscany");

        let result = aggregator.resolve(SourceKind::FarmPractice, &key, &ctx).await;

        assert!(matches!(
            aggregator.cache_key(SourceKind::FarmPractice, &ctx),
            Err(FetchError::Configuration { .. })
        ));
        assert_eq!(result.status, FetchStatus::Fallback);
        assert!(matches!(result.failure, Some(FetchError::Configuration { .. })));
        assert_eq!(
            result.payload["recommended_practices"],
            serde_json::json!(["crop_rotation", "minimum_tillage"])
        );
        assert!(http.requests().is_empty());
        assert!(aggregator.cache().is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_requests_collapse_to_one_entry() {
        let aggregator = Aggregator::builder()
            .with_http_client(Arc::new(OfflineHttpClient))
            .with_sources(&[SourceKind::MarketPrice])
            .build()
            .expect("valid builder");

        let bundle = aggregator
            .aggregate(
                &RequestContext::new(),
                &[SourceKind::MarketPrice, SourceKind::MarketPrice],
            )
            .await;

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.status(SourceKind::MarketPrice), Some(FetchStatus::Fallback));
    }

    #[tokio::test]
    async fn disabled_source_still_gets_a_fallback_entry() {
        let http = Arc::new(ScriptedHttpClient::new());
        let aggregator = Aggregator::builder()
            .with_http_client(http.clone())
            .with_sources(&[SourceKind::MarketPrice])
            .build()
            .expect("valid builder");

        let bundle = aggregator
            .aggregate(&RequestContext::for_region("Tuscany"), &[SourceKind::Sustainability])
            .await;

        let result = bundle.get(SourceKind::Sustainability).expect("entry present");
        assert_eq!(result.status, FetchStatus::Fallback);
        assert!(matches!(result.failure, Some(FetchError::Configuration { .. })));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn typed_views_read_fallbacks() {
        let aggregator = Aggregator::builder()
            .with_config(AgriConfig::default().with_weather_api_key("key"))
            .with_http_client(Arc::new(OfflineHttpClient))
            .build()
            .expect("valid builder");

        let bundle = aggregator.aggregate_all(&RequestContext::for_region("Bavaria")).await;

        assert_eq!(bundle.len(), 4);
        assert_eq!(bundle.sustainability().map(|m| m.water_efficiency), Some("high".into()));
        assert_eq!(bundle.market_prices().map(|p| p.len()), Some(2));
        assert!(bundle.weather().is_none());
        assert_eq!(bundle.degraded_sources().len(), 4);
    }
}
