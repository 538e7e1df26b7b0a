use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::{get_json, require_region, validate, FetchFuture, SourceFetcher};
use crate::http_client::{HttpClient, HttpRequest};
use crate::models::FarmPractices;
use crate::{FetchError, RequestContext, SourceKey, SourceKind, SourceRegistry};

/// FaST platform agricultural data, keyed by region.
#[derive(Clone)]
pub struct FarmPracticeFetcher {
    http: Arc<dyn HttpClient>,
    endpoint: String,
}

impl FarmPracticeFetcher {
    pub fn new(http: Arc<dyn HttpClient>, registry: &SourceRegistry) -> Self {
        Self {
            http,
            endpoint: registry.endpoint(SourceKind::FarmPractice).to_owned(),
        }
    }

    pub fn fallback_payload() -> Value {
        json!({
            "soil_nutrients": "moderate",
            "recommended_practices": ["crop_rotation", "minimum_tillage"]
        })
    }
}

impl SourceFetcher for FarmPracticeFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::FarmPractice
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
            let request = HttpRequest::get(self.endpoint.as_str())
                .with_query("region", region)
                .with_timeout(timeout);
            let body = get_json(self.http.as_ref(), request).await?;
            let _: FarmPractices = validate(&body, "farm practices")?;
            Ok(body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;

    #[tokio::test]
    async fn region_goes_into_the_query() {
        let http = Arc::new(ScriptedHttpClient::new().respond(
            SourceRegistry::FARM_PRACTICE_URL,
            200,
            r#"{"soil_nutrients":"rich","recommended_practices":["cover_crops"]}"#,
        ));
        let fetcher = FarmPracticeFetcher::new(http.clone(), &SourceRegistry::new());

        let payload = fetcher
            .fetch(&RequestContext::for_region("Tuscany"), Duration::from_secs(1))
            .await
            .expect("valid body");

        assert_eq!(payload["recommended_practices"], json!(["cover_crops"]));
        assert_eq!(http.requests()[0].query_value("region"), Some("Tuscany"));
    }

    #[tokio::test]
    async fn practices_must_be_a_list_of_strings() {
        let http = Arc::new(ScriptedHttpClient::new().respond(
            SourceRegistry::FARM_PRACTICE_URL,
            200,
            r#"{"soil_nutrients":"rich","recommended_practices":"cover_crops"}"#,
        ));
        let fetcher = FarmPracticeFetcher::new(http, &SourceRegistry::new());

        let error = fetcher
            .fetch(&RequestContext::for_region("Tuscany"), Duration::from_secs(1))
            .await
            .expect_err("wrong shape");

        assert!(matches!(error, FetchError::Malformed { .. }));
    }
}
