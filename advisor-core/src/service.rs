use tracing::{info, instrument};

use crate::{
    Config,
    error::Result,
    model::{Advisory, AdvisoryInput, AdvisoryRequest},
    provider::{WeatherProvider, weather_provider_from_config},
    strategy::{AdvisoryStrategy, strategy_from_config},
};

/// Fetches weather for a request and composes the advisory from it.
#[derive(Debug)]
pub struct AdvisorService {
    weather: Box<dyn WeatherProvider>,
    strategy: Box<dyn AdvisoryStrategy>,
}

impl AdvisorService {
    pub fn new(weather: Box<dyn WeatherProvider>, strategy: Box<dyn AdvisoryStrategy>) -> Self {
        Self { weather, strategy }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            weather_provider_from_config(config)?,
            strategy_from_config(config)?,
        ))
    }

    #[instrument(skip(self), fields(crop = %request.crop))]
    pub async fn advise(&self, request: &AdvisoryRequest) -> Result<Advisory> {
        let weather = self.weather.fetch(request.latitude, request.longitude).await?;

        let input = AdvisoryInput {
            crop: request.crop.clone(),
            soil_moisture: request.soil_moisture,
            weather,
        };
        let advisory = self.strategy.advise(&input).await?;

        info!(source = ?advisory.source, "advisory composed");
        Ok(advisory)
    }
}
