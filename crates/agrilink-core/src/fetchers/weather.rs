use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::{get_json, validate, FetchFuture, SourceFetcher};
use crate::http_client::{HttpClient, HttpRequest};
use crate::models::WeatherReport;
use crate::{Coordinates, FetchError, RequestContext, SourceKey, SourceKind, SourceRegistry};

/// OpenWeather current conditions, keyed by quantized coordinates.
#[derive(Clone)]
pub struct WeatherFetcher {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    api_key: Option<String>,
}

impl WeatherFetcher {
    pub fn new(http: Arc<dyn HttpClient>, registry: &SourceRegistry, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint: registry.endpoint(SourceKind::Weather).to_owned(),
            api_key,
        }
    }

    pub fn fallback_payload(failure: &FetchError) -> Value {
        json!({
            "temp": null,
            "humidity": null,
            "error": failure.to_string()
        })
    }

    fn coordinates(ctx: &RequestContext) -> Result<Coordinates, FetchError> {
        ctx.coordinates
            .ok_or(FetchError::MissingContext { field: "coordinates" })
    }
}

impl SourceFetcher for WeatherFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Weather
    }

    fn cache_key(&self, ctx: &RequestContext) -> Result<SourceKey, FetchError> {
        Ok(SourceKey::coordinates(self.kind(), Self::coordinates(ctx)?))
    }

    fn fallback(&self, failure: &FetchError) -> Value {
        Self::fallback_payload(failure)
    }

    fn fetch<'a>(&'a self, ctx: &'a RequestContext, timeout: Duration) -> FetchFuture<'a> {
        Box::pin(async move {
            let coordinates = Self::coordinates(ctx)?;
            let api_key = self.api_key.as_deref().ok_or_else(|| FetchError::Configuration {
                message: String::from("weather API key is not set"),
            })?;

            // Same integers as the cache key.
            let (lat, lon) = coordinates.quantized_degrees();
            let request = HttpRequest::get(self.endpoint.as_str())
                .with_query("lat", lat)
                .with_query("lon", lon)
                .with_query("appid", api_key)
                .with_query("units", "metric")
                .with_timeout(timeout);

            let body = get_json(self.http.as_ref(), request).await?;
            let _: WeatherReport = validate(&body, "weather report")?;
            Ok(body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;

    fn bavaria() -> RequestContext {
        RequestContext::for_coordinates(Coordinates::new(48.7904, 11.4979).expect("valid"))
    }

    #[tokio::test]
    async fn sends_quantized_coordinates_and_credential() {
        let http = Arc::new(ScriptedHttpClient::new().respond(
            SourceRegistry::WEATHER_URL,
            200,
            r#"{"main":{"temp":14.2,"humidity":71,"pressure":1013},"name":"Ingolstadt"}"#,
        ));
        let fetcher = WeatherFetcher::new(http.clone(), &SourceRegistry::new(), Some("owm-key".into()));

        let payload = fetcher.fetch(&bavaria(), Duration::from_secs(1)).await.expect("valid body");

        assert_eq!(payload["main"]["humidity"], json!(71));
        let request = &http.requests()[0];
        assert_eq!(request.query_value("lat"), Some("48.79"));
        assert_eq!(request.query_value("lon"), Some("11.50"));
        assert_eq!(request.query_value("appid"), Some("owm-key"));
        assert_eq!(request.query_value("units"), Some("metric"));
    }

    #[tokio::test]
    async fn request_point_matches_the_cache_key_on_halfway_values() {
        let http = Arc::new(ScriptedHttpClient::new().respond(
            SourceRegistry::WEATHER_URL,
            200,
            r#"{"main":{"temp":30.1,"humidity":80,"pressure":1010}}"#,
        ));
        let fetcher = WeatherFetcher::new(http.clone(), &SourceRegistry::new(), Some("owm-key".into()));
        // 1.115 sits on a binary halfway point between 1.11 and 1.12.
        let ctx = RequestContext::for_coordinates(Coordinates::new(1.115, 0.0).expect("valid"));

        let key = fetcher.cache_key(&ctx).expect("coordinates present");
        fetcher.fetch(&ctx, Duration::from_secs(1)).await.expect("valid body");

        let request = &http.requests()[0];
        assert_eq!(key.as_str(), "weather:coord:112:0");
        assert_eq!(request.query_value("lat"), Some("1.12"));
        assert_eq!(request.query_value("lon"), Some("0.00"));
    }

    #[tokio::test]
    async fn missing_credential_is_a_configuration_failure() {
        let http = Arc::new(ScriptedHttpClient::new());
        let fetcher = WeatherFetcher::new(http.clone(), &SourceRegistry::new(), None);

        let error = fetcher.fetch(&bavaria(), Duration::from_secs(1)).await.expect_err("no key");

        assert!(matches!(error, FetchError::Configuration { .. }));
        assert!(http.requests().is_empty());
    }

    #[test]
    fn fallback_carries_the_failure_message() {
        let payload = WeatherFetcher::fallback_payload(&FetchError::Status { status: 500 });
        assert_eq!(payload["temp"], Value::Null);
        assert_eq!(payload["humidity"], Value::Null);
        assert_eq!(payload["error"], json!("upstream returned status 500"));
    }
}
