use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::{
    model::RainDetection,
    provider::ProviderId,
    strategy::{DiseaseModel, MoistureScale, StrategyKind},
};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Credentials and optional endpoint override for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Replaces the provider's public URL, e.g. to point at a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Top-level configuration stored on disk and overlaid from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which advisory strategy to run: "generative" or "rules".
    pub strategy: StrategyKind,

    /// How soil moisture readings are interpreted.
    pub moisture_scale: MoistureScale,

    pub rain_detection: RainDetection,

    pub disease_model: DiseaseModel,

    /// Upper bound for every outbound HTTP call.
    pub request_timeout_ms: u64,

    pub bind_addr: String,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            moisture_scale: MoistureScale::default(),
            rain_detection: RainDetection::default(),
            disease_model: DiseaseModel::default(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            providers: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from disk (or defaults on first run) and apply the environment overlay.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Load config from disk only, or return defaults if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        check_timeout(cfg.request_timeout_ms).context("Invalid request_timeout_ms")?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "crop-advisor", "crop-advisor")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; present variables win over file values.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENWEATHER_API_KEY") {
            self.upsert_provider_api_key(ProviderId::OpenWeather, key);
        }
        if let Some(key) = non_empty("HUGGINGFACE_API_KEY") {
            self.upsert_provider_api_key(ProviderId::HuggingFace, key);
        }
        if let Some(ms) = non_empty("ADVISOR_TIMEOUT_MS") {
            self.request_timeout_ms = ms
                .trim()
                .parse::<u64>()
                .map_err(anyhow::Error::from)
                .and_then(check_timeout)
                .with_context(|| format!("ADVISOR_TIMEOUT_MS must be milliseconds, got '{ms}'"))?;
        }
        if let Some(scale) = non_empty("ADVISOR_MOISTURE_SCALE") {
            self.moisture_scale = scale.parse().context("Invalid ADVISOR_MOISTURE_SCALE")?;
        }
        if let Some(strategy) = non_empty("ADVISOR_STRATEGY") {
            self.strategy = strategy.parse().context("Invalid ADVISOR_STRATEGY")?;
        }
        if let Some(bind) = non_empty("ADVISOR_BIND") {
            self.bind_addr = bind;
        }

        Ok(())
    }

    /// Set or replace a provider API key, keeping any endpoint override.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .and_modify(|cfg| cfg.api_key = api_key.clone())
            .or_insert(ProviderConfig {
                api_key,
                endpoint: None,
            });
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    pub fn provider_endpoint(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).and_then(|cfg| cfg.endpoint.as_deref())
    }

    pub fn weather_api_key(&self) -> Option<&str> {
        self.provider_api_key(ProviderId::OpenWeather)
    }

    pub fn generative_api_key(&self) -> Option<&str> {
        self.provider_api_key(ProviderId::HuggingFace)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn check_timeout(ms: u64) -> Result<u64> {
    anyhow::ensure!(ms > 0, "request timeout must be greater than zero");
    Ok(ms)
}
