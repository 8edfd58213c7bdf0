use crate::{Config, WeatherSnapshot, error::Result, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod openweather;

/// Upstream services the advisor knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// OpenWeather current-conditions API.
    OpenWeather,
    /// Hugging Face Inference API for generated advisories.
    HuggingFace,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::HuggingFace => "huggingface",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::HuggingFace]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "huggingface" => Ok(ProviderId::HuggingFace),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, huggingface."
            )),
        }
    }
}

/// Source of current weather at a coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot>;
}

/// Construct the weather provider from config.
pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = ProviderId::OpenWeather;
    let api_key = config.weather_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `crop-advisor configure {id}` or set OPENWEATHER_API_KEY."
        )
    })?;

    let mut provider = OpenWeatherProvider::new(
        api_key.to_owned(),
        config.request_timeout(),
        config.rain_detection,
    )?;
    if let Some(endpoint) = config.provider_endpoint(id) {
        provider = provider.with_endpoint(endpoint);
    }

    Ok(Box::new(provider))
}
