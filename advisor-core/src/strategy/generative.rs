//! Advisories generated by the Hugging Face Inference API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{
    error::{AdvisorError, Result},
    model::{Advisory, AdvisoryInput, AdvisorySource},
    provider::openweather::truncate_body,
};

use super::{AdvisoryStrategy, MoistureScale};

const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models/google/flan-t5-small";

#[derive(Debug, Clone)]
pub struct GenerativeStrategy {
    api_key: String,
    endpoint: String,
    scale: MoistureScale,
    http: Client,
}

#[derive(Debug, Serialize)]
struct HfRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct HfGeneration {
    generated_text: Option<String>,
}

impl GenerativeStrategy {
    pub fn new(api_key: String, timeout: Duration, scale: MoistureScale) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scale,
            http,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The natural-language request sent to the model.
    pub fn prompt(&self, input: &AdvisoryInput) -> String {
        let weather = &input.weather;
        format!(
            "Given that the soil moisture is {moisture}, temperature is {temp}°C, \
             humidity is {humidity}%, rain expected: {rain}, and the crop is {crop}, suggest:\n\
             - Whether watering is needed\n\
             - Risk of any disease\n\
             - Any fertilizer or nutrient advice\n\
             - Whether the crop shows stress symptoms",
            moisture = self.scale.describe(input.soil_moisture),
            temp = weather.temperature_c,
            humidity = weather.humidity_pct,
            rain = if weather.rain_expected { "yes" } else { "no" },
            crop = input.crop,
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&HfRequest { inputs: prompt })
            .send()
            .await
            .map_err(|e| unavailable(format!("Failed to send request to Hugging Face: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| unavailable(format!("Failed to read Hugging Face response body: {e}")))?;

        if !status.is_success() {
            return Err(unavailable(format!(
                "Hugging Face request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let generations: Vec<HfGeneration> = serde_json::from_str(&body)
            .map_err(|e| unavailable(format!("Unexpected Hugging Face response shape: {e}")))?;

        generations
            .into_iter()
            .next()
            .and_then(|g| g.generated_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| unavailable("Hugging Face returned no generated text"))
    }
}

#[async_trait]
impl AdvisoryStrategy for GenerativeStrategy {
    async fn advise(&self, input: &AdvisoryInput) -> Result<Advisory> {
        let prompt = self.prompt(input);
        debug!(endpoint = %self.endpoint, "requesting generated advisory");

        let generated = self.generate(&prompt).await?;

        let text = format!(
            "Crop advisory for {}:\n\n{}\n\n{}",
            input.crop,
            generated,
            input.weather.summary()
        );

        Ok(Advisory {
            text,
            source: AdvisorySource::Generative,
        })
    }
}

fn unavailable(message: impl Into<String>) -> AdvisorError {
    AdvisorError::GenerativeUnavailable(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RainDetection, WeatherSnapshot};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn strategy(server: &MockServer) -> GenerativeStrategy {
        GenerativeStrategy::new("HF_KEY".into(), Duration::from_millis(200), MoistureScale::Percent)
            .expect("client should build")
            .with_endpoint(format!("{}/models/flan", server.uri()))
    }

    fn input() -> AdvisoryInput {
        AdvisoryInput {
            crop: "tomato".into(),
            soil_moisture: 35.0,
            weather: WeatherSnapshot::new(24.0, 65.0, "Drizzle", RainDetection::Strict),
        }
    }

    #[test]
    fn prompt_interpolates_every_input() {
        let offline =
            GenerativeStrategy::new("K".into(), Duration::from_secs(1), MoistureScale::Percent)
                .expect("client should build");
        let prompt = offline.prompt(&input());

        assert!(prompt.contains("soil moisture is 35%"));
        assert!(prompt.contains("temperature is 24°C"));
        assert!(prompt.contains("humidity is 65%"));
        assert!(prompt.contains("rain expected: yes"));
        assert!(prompt.contains("the crop is tomato"));
        assert!(prompt.contains("- Whether the crop shows stress symptoms"));
    }

    #[tokio::test]
    async fn wraps_generated_text_with_title_and_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/flan"))
            .and(header("authorization", "Bearer HF_KEY"))
            .and(body_partial_json(
                serde_json::json!({ "inputs": strategy(&server).prompt(&input()) }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "generated_text": "  Water lightly and watch for blight.  " }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let advisory = strategy(&server)
            .advise(&input())
            .await
            .expect("generation should succeed");

        assert_eq!(advisory.source, AdvisorySource::Generative);
        assert!(
            advisory
                .text
                .starts_with("Crop advisory for tomato:\n\nWater lightly and watch for blight.\n\n")
        );
        assert!(advisory.text.ends_with("Drizzle (rain expected: yes)."));
    }

    #[tokio::test]
    async fn missing_generated_text_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{}])))
            .mount(&server)
            .await;

        let err = strategy(&server).advise(&input()).await.unwrap_err();
        assert!(matches!(err, AdvisorError::GenerativeUnavailable(_)));
    }

    #[tokio::test]
    async fn unexpected_shape_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "estimated_time": 20.0 })),
            )
            .mount(&server)
            .await;

        let err = strategy(&server).advise(&input()).await.unwrap_err();
        assert!(err.to_string().contains("Unexpected Hugging Face response shape"));
    }

    #[tokio::test]
    async fn model_loading_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(serde_json::json!({ "error": "Model is loading" })),
            )
            .mount(&server)
            .await;

        let err = strategy(&server).advise(&input()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "generated_text": "late" }]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = strategy(&server).advise(&input()).await.unwrap_err();
        assert!(matches!(err, AdvisorError::GenerativeUnavailable(_)));
    }
}
