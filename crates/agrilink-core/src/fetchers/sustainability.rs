use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::{get_json, require_region, validate, FetchFuture, SourceFetcher};
use crate::http_client::{HttpClient, HttpRequest};
use crate::models::SustainabilityBody;
use crate::{FetchError, RequestContext, SourceKey, SourceKind, SourceRegistry};

/// Farm Sustainability Data Network metrics, keyed by region.
#[derive(Clone)]
pub struct SustainabilityFetcher {
    http: Arc<dyn HttpClient>,
    registry: SourceRegistry,
}

impl SustainabilityFetcher {
    pub fn new(http: Arc<dyn HttpClient>, registry: &SourceRegistry) -> Self {
        Self {
            http,
            registry: registry.clone(),
        }
    }

    pub fn fallback_payload() -> Value {
        json!({
            "soil_health": "medium",
            "water_efficiency": "high",
            "biodiversity": "medium"
        })
    }
}

impl SourceFetcher for SustainabilityFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Sustainability
    }

    fn cache_key(&self, ctx: &RequestContext) -> Result<SourceKey, FetchError> {
        Ok(SourceKey::region(self.kind(), require_region(ctx)?))
    }

    fn fallback(&self, _failure: &FetchError) -> Value {
        Self::fallback_payload()
    }

    fn fetch<'a>(&'a self, ctx: &'a RequestContext, timeout: Duration) -> FetchFuture<'a> {
        Box::pin(async move {
            let region = require_region(ctx)?;
            let url = self.registry.region_url(self.kind(), region);
            let mut body = get_json(self.http.as_ref(), HttpRequest::get(url).with_timeout(timeout)).await?;

            let parsed: SustainabilityBody = validate(&body, "sustainability metrics")?;
            if parsed.is_nested() {
                if let Some(inner) = body.get_mut("sustainability_metrics").map(Value::take) {
                    body = inner;
                }
            }
            Ok(body)
        })
    }
}
