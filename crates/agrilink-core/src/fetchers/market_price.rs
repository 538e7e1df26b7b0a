use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::{get_json, validate, FetchFuture, SourceFetcher};
use crate::http_client::{HttpClient, HttpRequest};
use crate::models::MarketPrices;
use crate::{FetchError, RequestContext, SourceKey, SourceKind, SourceRegistry};

/// Commodity price index. Not region specific, so every request shares one key.
#[derive(Clone)]
pub struct MarketPriceFetcher {
    http: Arc<dyn HttpClient>,
    endpoint: String,
}

impl MarketPriceFetcher {
    pub fn new(http: Arc<dyn HttpClient>, registry: &SourceRegistry) -> Self {
        Self {
            http,
            endpoint: registry.endpoint(SourceKind::MarketPrice).to_owned(),
        }
    }

    pub fn fallback_payload() -> Value {
        json!({
            "Wheat": {"price": 250, "unit": "EUR/tonne"},
            "Barley": {"price": 220, "unit": "EUR/tonne"}
        })
    }
}

impl SourceFetcher for MarketPriceFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::MarketPrice
    }

    fn cache_key(&self, _ctx: &RequestContext) -> Result<SourceKey, FetchError> {
        Ok(SourceKey::global(self.kind()))
    }

    fn fallback(&self, _failure: &FetchError) -> Value {
        Self::fallback_payload()
    }

    fn fetch<'a>(&'a self, _ctx: &'a RequestContext, timeout: Duration) -> FetchFuture<'a> {
        Box::pin(async move {
            let request = HttpRequest::get(self.endpoint.as_str()).with_timeout(timeout);
            let body = get_json(self.http.as_ref(), request).await?;

            let prices: MarketPrices = validate(&body, "market prices")?;
            if prices.is_empty() {
                return Err(FetchError::malformed("market prices: no crops listed"));
            }
            if let Some((crop, _)) = prices
                .iter()
                .find(|(_, price)| !price.price.is_finite() || price.price < 0.0)
            {
                return Err(FetchError::malformed(format!(
                    "market prices: invalid price for {crop}"
                )));
            }
            Ok(body)
        })
    }
}
