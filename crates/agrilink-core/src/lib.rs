//! # Agrilink Core
//!
//! External-data aggregation layer for agricultural decision support.
//!
//! ## Overview
//!
//! This crate gathers the inputs a crop recommendation needs from four
//! independent upstreams and merges them into one [`ResponseBundle`]:
//!
//! - **Source registry** naming each upstream, its endpoint and key scope
//! - **TTL cache** shared by every fetch, keyed per source and request
//! - **Source fetchers** with static fallback payloads
//! - **Aggregator** fanning requests out concurrently
//! - **Degradation policy** so one failing upstream never fails the request
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`aggregator`] | Concurrent fan-out and the response bundle |
//! | [`cache`] | In-memory TTL cache |
//! | [`clock`] | Wall clock and a manual clock for tests |
//! | [`config`] | Environment-driven configuration |
//! | [`context`] | Request context and cache key derivation |
//! | [`degradation`] | Fetch results and the fallback policy |
//! | [`error`] | Core error types |
//! | [`fetchers`] | One fetcher per upstream |
//! | [`http_client`] | HTTP client abstraction |
//! | [`models`] | Upstream response schemas |
//! | [`recommend`] | Prompt building and text generation |
//! | [`region`] | Built-in region catalog |
//! | [`registry`] | Source registry |
//! | [`source`] | Source identifiers |
//! | [`store`] | Land parcels and saved recommendations |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agrilink_core::{AgriConfig, Aggregator, Region, SourceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let aggregator = Aggregator::builder()
//!         .with_config(AgriConfig::from_env()?)
//!         .build()?;
//!
//!     let ctx = Region::find("Bavaria")?.to_context()?;
//!     let bundle = aggregator.aggregate(&ctx, &SourceKind::ALL).await;
//!
//!     if let Some(prices) = bundle.market_prices() {
//!         println!("{} crops priced", prices.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Aggregator    │────▶│    TTL Cache     │
//! └────────┬────────┘     └──────────────────┘
//!          │ one task per source
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Source Fetcher  │────▶│   HTTP Client    │
//! └────────┬────────┘     │ (reqwest/offline)│
//!          │ on failure   └──────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Fallback payload│
//! └─────────────────┘
//! ```

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod degradation;
pub mod error;
pub mod fetchers;
pub mod http_client;
pub mod models;
pub mod recommend;
pub mod region;
pub mod registry;
pub mod source;
pub mod store;

pub use aggregator::{Aggregator, AggregatorBuilder, ResponseBundle};
pub use cache::{CacheEntry, TtlCache, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AgriConfig, TextGenerationConfig};
pub use context::{Coordinates, RequestContext, SourceKey, COORDINATE_PRECISION};
pub use degradation::{FetchResult, FetchStatus};
pub use error::{ConfigError, FetchError, RecommendError, StoreError, ValidationError};
pub use fetchers::{CachedFetcher, SourceFetcher};
pub use http_client::{HttpClient, OfflineHttpClient, ReqwestHttpClient, ScriptedHttpClient};
pub use models::{
    market_overview, practice_label, ClimateReading, CropPrice, FarmPractices, MarketPrices,
    MarketRow, SustainabilityMetrics, WeatherReadings, WeatherReport,
};
pub use recommend::{
    build_prompt, parse_crop_yields, ChatCompletionsGenerator, CropYield, TextGenerator,
};
pub use region::{Region, REGIONS};
pub use registry::{KeyScope, SourceDescriptor, SourceRegistry};
pub use source::SourceKind;
pub use store::{InMemoryLandStore, Land, LandStore, NewLand, Recommendation};
