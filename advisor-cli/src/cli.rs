use advisor_core::{AdvisorService, AdvisoryRequest, Config, ProviderId};
use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Password;

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "crop-advisor", version, about = "Crop health advisor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider ("openweather" or "huggingface").
    Configure {
        provider: String,
    },

    /// Serve the advisory endpoint and form UI.
    Serve {
        /// Address to listen on; overrides config and ADVISOR_BIND.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print an advisory for a single reading.
    Advise {
        /// Crop name, e.g. "tomato".
        crop: String,

        #[arg(long)]
        soil_moisture: f64,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Serve { bind } => {
                let mut config = Config::load()?;
                if let Some(bind) = bind {
                    config.bind_addr = bind;
                }

                let advisor = AdvisorService::from_config(&config)?;
                server::run(advisor, &config.bind_addr).await
            }
            Command::Advise {
                crop,
                soil_moisture,
                lat,
                lon,
            } => {
                let config = Config::load()?;
                let advisor = AdvisorService::from_config(&config)?;

                let request = AdvisoryRequest::new(crop, soil_moisture, lat, lon)?;
                let advisory = advisor.advise(&request).await?;

                println!("{}", advisory.text);
                Ok(())
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;

    // The file only; keys from the environment must not be persisted.
    let mut config = Config::load_file()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        anyhow::bail!("API key for '{id}' must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.save()?;

    println!("Saved {id} credentials to {}", Config::config_file_path()?.display());
    Ok(())
}
