//! Core library for the crop health advisor.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider abstraction and its OpenWeather implementation
//! - Advisory strategies (deterministic rules, generated text, fallback)
//! - Shared domain models (requests, weather snapshots, advisories)
//!
//! It is used by `advisor-cli`, which exposes it over HTTP and the command line.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod strategy;

pub use config::{Config, ProviderConfig};
pub use error::AdvisorError;
pub use model::{Advisory, AdvisoryInput, AdvisoryRequest, RawAdvisoryRequest, WeatherSnapshot};
pub use provider::{ProviderId, WeatherProvider};
pub use service::AdvisorService;
pub use strategy::AdvisoryStrategy;
