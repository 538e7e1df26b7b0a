//! Behaviour tests for fan-out aggregation across all four sources.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agrilink_core::fetchers::FetchFuture;
use agrilink_core::http_client::{HttpResponse, Scripted};
use agrilink_core::{
    AgriConfig, Aggregator, ConfigError, FetchError, FetchStatus, OfflineHttpClient, Region,
    RequestContext, ScriptedHttpClient, SourceFetcher, SourceKey, SourceKind, SourceRegistry,
};
use serde_json::{json, Value};

const SUSTAINABILITY: &str = r#"{"soil_health":"good","water_efficiency":"medium","biodiversity":"high"}"#;
const PRACTICES: &str = r#"{"soil_nutrients":"rich","recommended_practices":["cover_crops","crop_rotation"]}"#;
const PRICES: &str = r#"{"Wheat":{"price":260,"unit":"EUR/tonne"},"Rapeseed":{"price":455,"unit":"EUR/tonne"}}"#;
const WEATHER: &str = r#"{"main":{"temp":21.4,"humidity":55,"pressure":1012},"name":"Ingolstadt"}"#;

fn healthy_upstreams() -> ScriptedHttpClient {
    ScriptedHttpClient::new()
        .respond("https://agriculture.ec.europa.eu/api/fsdn/", 200, SUSTAINABILITY)
        .respond(SourceRegistry::FARM_PRACTICE_URL, 200, PRACTICES)
        .respond(SourceRegistry::MARKET_PRICE_URL, 200, PRICES)
        .respond(SourceRegistry::WEATHER_URL, 200, WEATHER)
}

fn config() -> AgriConfig {
    AgriConfig::default().with_weather_api_key("test-key")
}

fn bavaria() -> RequestContext {
    Region::find("Bavaria")
        .and_then(Region::to_context)
        .expect("catalog region")
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn all_sources_are_merged_into_one_bundle() {
    // Given: every upstream is healthy
    let http = Arc::new(healthy_upstreams());
    let aggregator = Aggregator::builder()
        .with_config(config())
        .with_http_client(http.clone())
        .build()
        .expect("valid aggregator");

    // When: a catalog region is aggregated
    let bundle = aggregator.aggregate(&bavaria(), &SourceKind::ALL).await;

    // Then: there is one fetched entry per source
    assert_eq!(bundle.sources(), SourceKind::ALL.to_vec());
    assert_eq!(bundle.count(FetchStatus::Fetched), 4);
    assert!(bundle.degraded_sources().is_empty());

    // And: the typed views expose the upstream data
    let metrics = bundle.sustainability().expect("metrics");
    assert_eq!(metrics.soil_health, "good");
    let practices = bundle.farm_practices().expect("practices");
    assert_eq!(practices.practice_labels(), vec!["Cover Crops", "Crop Rotation"]);
    let prices = bundle.market_prices().expect("prices");
    assert_eq!(prices["Rapeseed"].price, 455.0);
    let weather = bundle.weather().expect("weather");
    assert_eq!(weather.main.humidity, 55.0);

    // And: extra upstream fields are kept verbatim
    assert_eq!(
        bundle.payload(SourceKind::Weather).map(|payload| &payload["name"]),
        Some(&json!("Ingolstadt"))
    );

    // And: each request carried the right parameters
    let requests = http.requests();
    let fsdn = requests
        .iter()
        .find(|request| request.url.starts_with("https://agriculture.ec.europa.eu"))
        .expect("sustainability request");
    assert_eq!(fsdn.url, "https://agriculture.ec.europa.eu/api/fsdn/region/Bavaria");
    let weather_request = requests
        .iter()
        .find(|request| request.url == SourceRegistry::WEATHER_URL)
        .expect("weather request");
    assert_eq!(weather_request.query_value("lat"), Some("48.79"));
    assert_eq!(weather_request.query_value("lon"), Some("11.50"));
    assert_eq!(weather_request.query_value("appid"), Some("test-key"));
    assert_eq!(weather_request.query_value("units"), Some("metric"));
}

#[tokio::test]
async fn sources_are_fetched_concurrently() {
    let delayed = |body: &str| Scripted::Delay(Duration::from_millis(300), HttpResponse::ok_json(body));
    let http = Arc::new(
        ScriptedHttpClient::new()
            .on("https://agriculture.ec.europa.eu/api/fsdn/", delayed(SUSTAINABILITY))
            .on(SourceRegistry::FARM_PRACTICE_URL, delayed(PRACTICES))
            .on(SourceRegistry::MARKET_PRICE_URL, delayed(PRICES))
            .on(SourceRegistry::WEATHER_URL, delayed(WEATHER)),
    );
    let aggregator = Aggregator::builder()
        .with_config(config().with_request_timeout(Duration::from_secs(5)))
        .with_http_client(http)
        .build()
        .expect("valid aggregator");

    let started = Instant::now();
    let bundle = aggregator.aggregate(&bavaria(), &SourceKind::ALL).await;
    let elapsed = started.elapsed();

    assert_eq!(bundle.count(FetchStatus::Fetched), 4);
    assert!(
        elapsed < Duration::from_millis(1_000),
        "four 300 ms fetches took {elapsed:?}"
    );
}

// =============================================================================
// Degradation
// =============================================================================

#[tokio::test]
async fn offline_run_returns_every_fallback() {
    let aggregator = Aggregator::builder()
        .with_config(config())
        .with_http_client(Arc::new(OfflineHttpClient))
        .build()
        .expect("valid aggregator");

    let bundle = aggregator.aggregate(&bavaria(), &SourceKind::ALL).await;

    assert_eq!(bundle.len(), 4);
    assert_eq!(bundle.count(FetchStatus::Fallback), 4);
    assert_eq!(
        bundle.payload(SourceKind::Sustainability),
        Some(&json!({"soil_health": "medium", "water_efficiency": "high", "biodiversity": "medium"}))
    );
    assert_eq!(
        bundle.payload(SourceKind::FarmPractice),
        Some(&json!({"soil_nutrients": "moderate", "recommended_practices": ["crop_rotation", "minimum_tillage"]}))
    );
    assert_eq!(
        bundle.payload(SourceKind::MarketPrice),
        Some(&json!({"Wheat": {"price": 250, "unit": "EUR/tonne"}, "Barley": {"price": 220, "unit": "EUR/tonne"}}))
    );
    assert!(matches!(
        bundle.get(SourceKind::Weather).and_then(|result| result.failure.clone()),
        Some(FetchError::Transport { .. })
    ));
    assert!(aggregator.cache().is_empty().await);
}

#[tokio::test]
async fn malformed_bodies_take_the_fallback_path() {
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond(SourceRegistry::MARKET_PRICE_URL, 200, r#"{"Wheat":{"price":"cheap"}}"#)
            .respond(SourceRegistry::FARM_PRACTICE_URL, 200, r#"{"soil_nutrients":7,"recommended_practices":[]}"#),
    );
    let aggregator = Aggregator::builder()
        .with_config(config())
        .with_http_client(http)
        .build()
        .expect("valid aggregator");

    let bundle = aggregator
        .aggregate(
            &RequestContext::for_region("Tuscany"),
            &[SourceKind::MarketPrice, SourceKind::FarmPractice],
        )
        .await;

    for source in [SourceKind::MarketPrice, SourceKind::FarmPractice] {
        let result = bundle.get(source).expect("entry present");
        assert_eq!(result.status, FetchStatus::Fallback, "{source}");
        assert!(matches!(result.failure, Some(FetchError::Malformed { .. })), "{source}");
    }
}

#[tokio::test]
async fn missing_context_degrades_only_the_sources_that_need_it() {
    let http = Arc::new(healthy_upstreams());
    let aggregator = Aggregator::builder()
        .with_config(config())
        .with_http_client(http.clone())
        .build()
        .expect("valid aggregator");

    // A region with no coordinates: weather cannot be keyed.
    let bundle = aggregator
        .aggregate(&RequestContext::for_region("Provence"), &SourceKind::ALL)
        .await;

    assert_eq!(bundle.len(), 4);
    assert_eq!(bundle.degraded_sources(), vec![SourceKind::Weather]);
    assert_eq!(
        bundle.get(SourceKind::Weather).and_then(|result| result.failure.clone()),
        Some(FetchError::MissingContext { field: "coordinates" })
    );
    assert_eq!(http.request_count(SourceRegistry::WEATHER_URL), 0);
}

// =============================================================================
// Wiring
// =============================================================================

#[test]
fn weather_requires_a_credential_at_build_time() {
    let result = Aggregator::builder()
        .with_http_client(Arc::new(OfflineHttpClient))
        .build();

    assert!(matches!(
        result.err(),
        Some(ConfigError::MissingCredential {
            source_name: "weather",
            ..
        })
    ));
}

#[test]
fn endpoint_overrides_are_validated() {
    let result = AgriConfig::from_lookup(|name| match name {
        "AGRILINK_MARKET_PRICE_URL" => Some(String::from("ftp://prices.example.test")),
        _ => None,
    });

    assert!(matches!(result, Err(ConfigError::InvalidEndpoint { .. })));
}

#[tokio::test]
async fn endpoint_override_is_used_for_requests() {
    let config = AgriConfig::from_lookup(|name| match name {
        "AGRILINK_MARKET_PRICE_URL" => Some(String::from("https://mirror.example.test/prices/")),
        _ => None,
    })
    .expect("valid configuration");
    let http = Arc::new(ScriptedHttpClient::new().respond("https://mirror.example.test/prices", 200, PRICES));
    let aggregator = Aggregator::builder()
        .with_config(config)
        .with_http_client(http)
        .with_sources(&[SourceKind::MarketPrice])
        .build()
        .expect("valid aggregator");

    let bundle = aggregator.aggregate(&RequestContext::new(), &[SourceKind::MarketPrice]).await;

    assert_eq!(bundle.status(SourceKind::MarketPrice), Some(FetchStatus::Fetched));
}

#[tokio::test]
async fn sustainability_mirror_without_placeholder_keeps_regions_apart() {
    // Given: the sustainability endpoint points at a mirror base URL
    let config = AgriConfig::from_lookup(|name| match name {
        "AGRILINK_SUSTAINABILITY_URL" => Some(String::from("http://mirror.test/fsdn")),
        _ => None,
    })
    .expect("valid configuration");
    let http = Arc::new(ScriptedHttpClient::new().respond("http://mirror.test/fsdn/", 200, SUSTAINABILITY));
    let aggregator = Aggregator::builder()
        .with_config(config)
        .with_http_client(http.clone())
        .with_sources(&[SourceKind::Sustainability])
        .build()
        .expect("valid aggregator");

    // When: two regions are aggregated
    for region in ["Tuscany", "Bavaria"] {
        let bundle = aggregator
            .aggregate(&RequestContext::for_region(region), &[SourceKind::Sustainability])
            .await;
        assert_eq!(bundle.status(SourceKind::Sustainability), Some(FetchStatus::Fetched));
    }

    // Then: each region was requested under its own path
    let urls: Vec<String> = http.requests().into_iter().map(|request| request.url).collect();
    assert_eq!(urls, vec!["http://mirror.test/fsdn/Tuscany", "http://mirror.test/fsdn/Bavaria"]);
}

/// Fixed-answer fetcher standing in for a regional mirror.
struct StaticSustainability;

impl SourceFetcher for StaticSustainability {
    fn kind(&self) -> SourceKind {
        SourceKind::Sustainability
    }

    fn cache_key(&self, _ctx: &RequestContext) -> Result<SourceKey, FetchError> {
        Ok(SourceKey::global(SourceKind::Sustainability))
    }

    fn fallback(&self, _failure: &FetchError) -> Value {
        json!({})
    }

    fn fetch<'a>(&'a self, _ctx: &'a RequestContext, _timeout: Duration) -> FetchFuture<'a> {
        Box::pin(async {
            Ok(json!({"soil_health": "excellent", "water_efficiency": "high", "biodiversity": "high"}))
        })
    }
}

#[tokio::test]
async fn custom_fetchers_replace_built_in_ones() {
    let aggregator = Aggregator::builder()
        .with_http_client(Arc::new(OfflineHttpClient))
        .with_sources(&[])
        .with_fetcher(Arc::new(StaticSustainability))
        .build()
        .expect("no weather, no credential needed");

    let bundle = aggregator.aggregate(&RequestContext::new(), &[SourceKind::Sustainability]).await;

    assert_eq!(aggregator.sources(), vec![SourceKind::Sustainability]);
    assert_eq!(
        bundle.sustainability().map(|metrics| metrics.soil_health),
        Some(String::from("excellent"))
    );
}
