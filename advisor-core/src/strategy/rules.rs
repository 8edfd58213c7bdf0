//! Deterministic advisory rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    error::Result,
    model::{Advisory, AdvisoryInput, AdvisorySource, WeatherSnapshot},
};

use super::AdvisoryStrategy;

/// Interpretation of the soil moisture reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoistureScale {
    /// 0-100 percent, higher is wetter.
    #[default]
    Percent,
    /// Raw capacitive sensor value, higher is drier.
    RawSensor,
}

impl MoistureScale {
    /// Reading at which the soil counts as severely dry.
    fn is_severely_dry(&self, reading: f64) -> bool {
        match self {
            MoistureScale::Percent => reading < 15.0,
            MoistureScale::RawSensor => reading > 850.0,
        }
    }

    pub fn describe(&self, reading: f64) -> String {
        match self {
            MoistureScale::Percent => format!("{reading}%"),
            MoistureScale::RawSensor => format!("a sensor reading of {reading} (higher is drier)"),
        }
    }
}

impl FromStr for MoistureScale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percent" => Ok(MoistureScale::Percent),
            "raw_sensor" | "raw" => Ok(MoistureScale::RawSensor),
            other => Err(anyhow::anyhow!(
                "Unknown moisture scale '{other}'. Supported scales: percent, raw_sensor."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WateringAdvice {
    WaterNow,
    Monitor,
    /// Percent scale, adequate moisture.
    NotNeeded,
    /// Raw scale, below 300.
    VeryMoist,
    /// Raw scale, 300 to 700.
    ModeratelyMoist,
    HoldForRain,
}

impl WateringAdvice {
    pub fn assess(scale: MoistureScale, reading: f64, rain_expected: bool) -> Self {
        if rain_expected {
            return WateringAdvice::HoldForRain;
        }

        match scale {
            MoistureScale::Percent if reading < 30.0 => WateringAdvice::WaterNow,
            MoistureScale::Percent if reading <= 60.0 => WateringAdvice::Monitor,
            MoistureScale::Percent => WateringAdvice::NotNeeded,
            MoistureScale::RawSensor if reading < 300.0 => WateringAdvice::VeryMoist,
            MoistureScale::RawSensor if reading <= 700.0 => WateringAdvice::ModeratelyMoist,
            MoistureScale::RawSensor => WateringAdvice::WaterNow,
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            WateringAdvice::WaterNow => "Needed immediately. Soil moisture is too low.",
            WateringAdvice::Monitor => "Monitor closely, may need watering in 1-2 days.",
            WateringAdvice::NotNeeded => "Not needed. Soil moisture is adequate.",
            WateringAdvice::VeryMoist => "Not needed. Soil is very moist.",
            WateringAdvice::ModeratelyMoist => "Not needed. Soil is moderately moist.",
            WateringAdvice::HoldForRain => "Hold off on irrigation. Rain is expected.",
        }
    }
}

/// How disease risk is derived from humidity and temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseModel {
    /// Humidity alone.
    Simple,
    /// Humidity and temperature jointly.
    #[default]
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiseaseRisk {
    Low,
    Moderate,
    High,
}

impl DiseaseRisk {
    pub fn assess(model: DiseaseModel, humidity_pct: f64, temperature_c: f64) -> Self {
        match model {
            DiseaseModel::Simple if humidity_pct > 80.0 => DiseaseRisk::High,
            DiseaseModel::Simple => DiseaseRisk::Low,
            DiseaseModel::Combined if humidity_pct > 85.0 && temperature_c > 25.0 => {
                DiseaseRisk::High
            }
            DiseaseModel::Combined if humidity_pct > 75.0 || temperature_c > 30.0 => {
                DiseaseRisk::Moderate
            }
            DiseaseModel::Combined => DiseaseRisk::Low,
        }
    }
}

impl fmt::Display for DiseaseRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiseaseRisk::Low => "Low",
            DiseaseRisk::Moderate => "Moderate",
            DiseaseRisk::High => "High",
        })
    }
}

pub const BALANCED_FERTILIZER: &str =
    "Apply a balanced NPK fertilizer to supply balanced nutrients within the next week.";

/// Nutrient focus for a crop, matched case-insensitively.
pub fn fertilizer_guidance(crop: &str) -> &'static str {
    match crop.trim().to_lowercase().as_str() {
        "tomato" => {
            "Focus on phosphorus for root and fruit development, with potassium once fruit sets."
        }
        "potato" => "Focus on potassium for tuber bulking, with moderate phosphorus at planting.",
        "rice" => {
            "Focus on nitrogen in split doses, and correct zinc deficiency if leaves bronze."
        }
        "wheat" => "Focus on nitrogen at tillering and again before heading.",
        "corn" => "Focus on nitrogen, side-dressed when plants are knee high.",
        "cotton" => "Focus on potassium and nitrogen during boll formation.",
        _ => BALANCED_FERTILIZER,
    }
}

/// Independently evaluated stress conditions, in a fixed order.
pub fn stress_indicators(
    scale: MoistureScale,
    soil_moisture: f64,
    weather: &WeatherSnapshot,
) -> Vec<&'static str> {
    let checks = [
        (weather.temperature_c > 30.0, "heat stress from temperatures above 30°C"),
        (weather.temperature_c < 10.0, "cold stress from temperatures below 10°C"),
        (weather.humidity_pct > 90.0, "excessive humidity above 90%"),
        (scale.is_severely_dry(soil_moisture), "dry-soil stress from a severely dry reading"),
    ];

    checks
        .into_iter()
        .filter_map(|(triggered, description)| triggered.then_some(description))
        .collect()
}

/// The always-available advisory composer.
#[derive(Debug, Clone, Default)]
pub struct RulesStrategy {
    scale: MoistureScale,
    disease_model: DiseaseModel,
}

impl RulesStrategy {
    pub fn new(scale: MoistureScale, disease_model: DiseaseModel) -> Self {
        Self {
            scale,
            disease_model,
        }
    }

    pub fn compose(&self, input: &AdvisoryInput) -> Advisory {
        let weather = &input.weather;

        let watering =
            WateringAdvice::assess(self.scale, input.soil_moisture, weather.rain_expected);
        let risk =
            DiseaseRisk::assess(self.disease_model, weather.humidity_pct, weather.temperature_c);
        let stress = stress_indicators(self.scale, input.soil_moisture, weather);

        let stress_line = if stress.is_empty() {
            "No stress detected.".to_string()
        } else {
            format!("Detected {}.", stress.join("; "))
        };

        let text = format!(
            "Based on your {crop} with soil moisture of {moisture}:\n\n\
             - Watering: {watering}\n\
             - Disease Risk: {risk} based on current humidity ({humidity:.0}%) \
             and temperature ({temp:.1}°C).\n\
             - Fertilizer: {fertilizer}\n\
             - Stress: {stress_line}\n\n\
             {summary}",
            crop = input.crop,
            moisture = self.scale.describe(input.soil_moisture),
            watering = watering.phrase(),
            humidity = weather.humidity_pct,
            temp = weather.temperature_c,
            fertilizer = fertilizer_guidance(&input.crop),
            summary = weather.summary(),
        );

        Advisory {
            text,
            source: AdvisorySource::Rules,
        }
    }
}

#[async_trait]
impl AdvisoryStrategy for RulesStrategy {
    async fn advise(&self, input: &AdvisoryInput) -> Result<Advisory> {
        Ok(self.compose(input))
    }
}
