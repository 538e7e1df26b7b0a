//! Crop recommendations: prompt assembly, the text-generation seam and
//! yield extraction from the generated text.
//!
//! Unlike the data sources, text generation does not degrade. A failed
//! call is returned to the caller as a [`RecommendError`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::TextGenerationConfig;
use crate::http_client::{HttpClient, HttpRequest};
use crate::{RecommendError, ResponseBundle, SourceKind};

/// Sampling temperature sent with every completion request.
pub const GENERATION_TEMPERATURE: f64 = 0.7;

/// Generation is much slower than the data sources.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

const UNKNOWN: &str = "Unknown";

/// Build the recommendation prompt for a region from an aggregated bundle.
///
/// Missing readings render as `Unknown`; fallback payloads are used as-is.
pub fn build_prompt(region_name: &str, soil_type: &str, bundle: &ResponseBundle) -> String {
    let weather = bundle.payload(SourceKind::Weather);
    let reading = |field: &str| {
        weather
            .and_then(|payload| payload.get("main"))
            .and_then(|main| main.get(field))
            .map_or_else(|| UNKNOWN.to_owned(), display_value)
    };
    let sustainability = bundle.payload(SourceKind::Sustainability);
    let metric = |field: &str| {
        sustainability
            .and_then(|payload| payload.get(field))
            .map_or_else(|| UNKNOWN.to_owned(), display_value)
    };
    let market = bundle
        .payload(SourceKind::MarketPrice)
        .cloned()
        .unwrap_or_else(|| json!({}));
    let market = serde_json::to_string_pretty(&market).unwrap_or_else(|_| market.to_string());

    format!(
        "Based on comprehensive European agricultural data, provide detailed agricultural recommendations:

Region: {region_name}

Environmental Conditions:
- Temperature: {temperature}°C
- Humidity: {humidity}%
- Soil Type: {soil_type}

Sustainability Metrics:
- Soil Health: {soil_health}
- Water Efficiency: {water_efficiency}
- Biodiversity: {biodiversity}

Market Conditions:
{market}

Please provide a comprehensive analysis including:
1. Top 3 recommended crops with expected yield projections
2. Optimal planting and harvesting schedule
3. Suggested crop rotation plan for the next 3 seasons
4. Sustainable farming practices specific to the region
5. Market outlook and price predictions
6. Risk mitigation strategies

Format the response in clear sections with bullet points where appropriate.
",
        temperature = reading("temp"),
        humidity = reading("humidity"),
        soil_health = metric("soil_health"),
        water_efficiency = metric("water_efficiency"),
        biodiversity = metric("biodiversity"),
    )
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => UNKNOWN.to_owned(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, RecommendError>> + Send + 'a>>;

/// Text-generation collaborator.
pub trait TextGenerator: Send + Sync {
    fn recommend<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
}

/// OpenAI-compatible `chat/completions` client.
#[derive(Clone)]
pub struct ChatCompletionsGenerator {
    http: Arc<dyn HttpClient>,
    api_key: String,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl ChatCompletionsGenerator {
    pub fn new(
        http: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// # Errors
    ///
    /// [`RecommendError::NotConfigured`] when no API key is configured.
    pub fn from_config(
        http: Arc<dyn HttpClient>,
        config: &TextGenerationConfig,
    ) -> Result<Self, RecommendError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(RecommendError::NotConfigured {
                variable: "AGRILINK_LLM_API_KEY",
            })?;
        Ok(Self::new(http, api_key, &config.base_url, config.model.clone()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl TextGenerator for ChatCompletionsGenerator {
    fn recommend<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            let body = json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": GENERATION_TEMPERATURE,
            });
            let request = HttpRequest::post(&self.endpoint)
                .with_bearer_token(&self.api_key)
                .with_json_body(body.to_string())
                .with_timeout(self.timeout);

            debug!(endpoint = %self.endpoint, model = %self.model, "requesting recommendation");
            let response = self
                .http
                .execute(request)
                .await
                .map_err(|error| RecommendError::Transport {
                    message: error.message().to_owned(),
                })?;

            if !response.is_success() {
                return Err(RecommendError::Status {
                    status: response.status,
                });
            }

            let completion: ChatCompletion =
                response.json().map_err(|error| RecommendError::Malformed {
                    message: error.to_string(),
                })?;

            completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or_else(|| RecommendError::Malformed {
                    message: String::from("completion has no message content"),
                })
        })
    }
}

/// Projected yield for one crop, in tonnes per hectare.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropYield {
    pub crop: String,
    pub tons: f64,
}

/// Extract `Crop: 4.5 tons` style yield lines from recommendation text.
///
/// Only lines mentioning "yield" are considered. When none of them parses,
/// a fixed Wheat/Barley/Corn distribution is returned so the chart always
/// has data.
pub fn parse_crop_yields(text: &str) -> Vec<CropYield> {
    let parsed: Vec<CropYield> = text.lines().filter_map(parse_yield_line).collect();
    if parsed.is_empty() {
        default_crop_yields()
    } else {
        parsed
    }
}

fn parse_yield_line(line: &str) -> Option<CropYield> {
    if !line.to_lowercase().contains("yield") {
        return None;
    }
    let mut parts = line.split(':');
    let crop = parts
        .next()?
        .trim()
        .trim_start_matches(['-', '*', '•'])
        .trim();
    let tons = parts.next()?.split("tons").next()?.trim().parse::<f64>().ok()?;
    if crop.is_empty() || !tons.is_finite() {
        return None;
    }
    Some(CropYield {
        crop: crop.to_owned(),
        tons,
    })
}

pub fn default_crop_yields() -> Vec<CropYield> {
    [("Wheat", 4.5), ("Barley", 3.2), ("Corn", 2.8)]
        .into_iter()
        .map(|(crop, tons)| CropYield {
            crop: crop.to_owned(),
            tons,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpMethod, ScriptedHttpClient};

    #[test]
    fn yield_lines_are_extracted() {
        let text = "## Crops\n- Wheat yield: 6.1 tons per hectare\nBarley yield: 4 tons\nNotes: none";

        assert_eq!(
            parse_crop_yields(text),
            vec![
                CropYield {
                    crop: String::from("Wheat yield"),
                    tons: 6.1
                },
                CropYield {
                    crop: String::from("Barley yield"),
                    tons: 4.0
                },
            ]
        );
    }

    #[test]
    fn unparseable_text_uses_default_distribution() {
        let yields = parse_crop_yields("Expected yield: high\nno numbers here");
        assert_eq!(yields, default_crop_yields());
        assert_eq!(yields[2].crop, "Corn");
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = TextGenerationConfig::default();
        let error = ChatCompletionsGenerator::from_config(Arc::new(ScriptedHttpClient::new()), &config)
            .err()
            .expect("no key configured");
        assert_eq!(
            error,
            RecommendError::NotConfigured {
                variable: "AGRILINK_LLM_API_KEY"
            }
        );
    }

    #[tokio::test]
    async fn completion_content_is_returned() {
        let http = Arc::new(ScriptedHttpClient::new().respond(
            "https://llm.example.test/v1/chat/completions",
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Plant barley."}}]}"#,
        ));
        let generator =
            ChatCompletionsGenerator::new(http.clone(), "secret", "https://llm.example.test/v1/", "m");

        let text = generator.recommend("prompt").await.expect("completion");

        assert_eq!(text, "Plant barley.");
        let request = &http.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer secret")
        );
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or_default())
            .expect("json body");
        assert_eq!(body["temperature"], json!(0.7));
        assert_eq!(body["messages"][0]["content"], json!("prompt"));
    }

    #[tokio::test]
    async fn upstream_status_is_an_error() {
        let http = Arc::new(ScriptedHttpClient::new().respond("https://llm.example.test", 429, "{}"));
        let generator = ChatCompletionsGenerator::new(http, "secret", "https://llm.example.test", "m");

        assert_eq!(
            generator.recommend("prompt").await,
            Err(RecommendError::Status { status: 429 })
        );
    }
}
