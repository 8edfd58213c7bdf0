//! Advisory strategies.
//!
//! The deterministic rule set is always available. The generative delegate
//! is wrapped in [`FallbackStrategy`] so its failures never reach callers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, str::FromStr};
use tracing::warn;

use crate::{
    Config,
    error::Result,
    model::{Advisory, AdvisoryInput},
    provider::ProviderId,
};

pub mod fallback;
pub mod generative;
pub mod rules;

pub use fallback::FallbackStrategy;
pub use generative::GenerativeStrategy;
pub use rules::{DiseaseModel, DiseaseRisk, MoistureScale, RulesStrategy, WateringAdvice};

/// Something that can turn crop and weather data into an advisory.
#[async_trait]
pub trait AdvisoryStrategy: Send + Sync + Debug {
    async fn advise(&self, input: &AdvisoryInput) -> Result<Advisory>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Deterministic rules only.
    Rules,
    /// Generated text with the rules as fallback.
    #[default]
    Generative,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rules" => Ok(StrategyKind::Rules),
            "generative" => Ok(StrategyKind::Generative),
            other => Err(anyhow::anyhow!(
                "Unknown strategy '{other}'. Supported strategies: rules, generative."
            )),
        }
    }
}

/// Build the strategy stack described by `config`.
///
/// A generative strategy without credentials degrades to rules only.
pub fn strategy_from_config(config: &Config) -> anyhow::Result<Box<dyn AdvisoryStrategy>> {
    let rules = RulesStrategy::new(config.moisture_scale, config.disease_model);

    let api_key = match (config.strategy, config.generative_api_key()) {
        (StrategyKind::Rules, _) => return Ok(Box::new(rules)),
        (StrategyKind::Generative, None) => {
            warn!(
                "No API key configured for provider '{}'; using rule-based advisories only",
                ProviderId::HuggingFace
            );
            return Ok(Box::new(rules));
        }
        (StrategyKind::Generative, Some(key)) => key,
    };

    let mut generative = GenerativeStrategy::new(
        api_key.to_owned(),
        config.request_timeout(),
        config.moisture_scale,
    )?;
    if let Some(endpoint) = config.provider_endpoint(ProviderId::HuggingFace) {
        generative = generative.with_endpoint(endpoint);
    }

    Ok(Box::new(FallbackStrategy::new(generative, rules)))
}
