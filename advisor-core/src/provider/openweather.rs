use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    error::{AdvisorError, Result},
    model::{RainDetection, WeatherSnapshot},
};

use super::WeatherProvider;

const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    endpoint: String,
    rain_detection: RainDetection,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(
        api_key: String,
        timeout: Duration,
        rain_detection: RainDetection,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            rain_detection,
            http,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn snapshot_from(&self, parsed: OwCurrentResponse) -> Result<WeatherSnapshot> {
        let main = parsed
            .main
            .ok_or_else(|| upstream("OpenWeather response has no 'main' block"))?;
        let temperature_c = main
            .temp
            .ok_or_else(|| upstream("OpenWeather response has no temperature"))?;
        let humidity_pct = main
            .humidity
            .ok_or_else(|| upstream("OpenWeather response has no humidity"))?;

        let condition = parsed
            .weather
            .first()
            .map(|w| w.main.clone())
            .ok_or_else(|| upstream("OpenWeather response has no weather condition"))?;

        let rain_expected = self
            .rain_detection
            .any(parsed.weather.iter().map(|w| w.main.as_str()));

        let observation_time = parsed
            .dt
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);

        Ok(WeatherSnapshot {
            temperature_c,
            humidity_pct,
            condition,
            rain_expected,
            location_name: parsed.name,
            observation_time,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: Option<i64>,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot> {
        let lat = latitude.to_string();
        let lon = longitude.to_string();

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenWeather request failed");
                upstream(format!("Failed to send request to OpenWeather: {e}"))
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| upstream(format!("Failed to read OpenWeather response body: {e}")))?;

        if !status.is_success() {
            warn!(%status, "OpenWeather returned an error status");
            return Err(upstream(format!(
                "OpenWeather request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| upstream(format!("Failed to parse OpenWeather JSON: {e}")))?;

        let snapshot = self.snapshot_from(parsed)?;
        debug!(
            temperature_c = snapshot.temperature_c,
            humidity_pct = snapshot.humidity_pct,
            condition = %snapshot.condition,
            rain_expected = snapshot.rain_expected,
            "fetched weather"
        );

        Ok(snapshot)
    }
}

fn upstream(message: impl Into<String>) -> AdvisorError {
    AdvisorError::UpstreamUnavailable(message.into())
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
