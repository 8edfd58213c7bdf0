use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide all required fields.";

/// Wire shape of an advisory request.
///
/// Every field is optional so that a missing value surfaces as a validation
/// failure instead of a deserialization error. Browser forms post number
/// inputs as strings, so numeric fields accept either representation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAdvisoryRequest {
    pub crop: Option<String>,
    pub soil_moisture: Option<NumberOrText>,
    pub latitude: Option<NumberOrText>,
    pub longitude: Option<NumberOrText>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn parse(&self, field: &str) -> Result<f64> {
        let value = match self {
            NumberOrText::Number(n) => *n,
            NumberOrText::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                AdvisorError::Validation(format!("Field '{field}' must be a number, got '{s}'."))
            })?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(AdvisorError::Validation(format!("Field '{field}' must be a finite number.")))
        }
    }
}

impl From<f64> for NumberOrText {
    fn from(value: f64) -> Self {
        NumberOrText::Number(value)
    }
}

impl RawAdvisoryRequest {
    /// Check presence and ranges, producing a request the advisor can act on.
    pub fn validate(self) -> Result<AdvisoryRequest> {
        let (Some(crop), Some(soil_moisture), Some(latitude), Some(longitude)) =
            (self.crop, self.soil_moisture, self.latitude, self.longitude)
        else {
            return Err(AdvisorError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        };

        let crop = crop.trim();
        if crop.is_empty() {
            return Err(AdvisorError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        }

        let request = AdvisoryRequest {
            crop: crop.to_string(),
            soil_moisture: soil_moisture.parse("soilMoisture")?,
            latitude: latitude.parse("latitude")?,
            longitude: longitude.parse("longitude")?,
        };
        request.check_coordinates()?;

        Ok(request)
    }
}

/// A validated advisory request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    pub crop: String,
    pub soil_moisture: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl AdvisoryRequest {
    pub fn new(
        crop: impl Into<String>,
        soil_moisture: f64,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self> {
        RawAdvisoryRequest {
            crop: Some(crop.into()),
            soil_moisture: Some(soil_moisture.into()),
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
        }
        .validate()
    }

    fn check_coordinates(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AdvisorError::Validation(format!(
                "Latitude {} is out of range (-90..=90).",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AdvisorError::Validation(format!(
                "Longitude {} is out of range (-180..=180).",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// How a provider's condition labels translate into the rain-expected flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainDetection {
    /// Any label containing rain, drizzle or thunderstorm, ignoring case.
    Lenient,
    /// Only the exact labels `Rain`, `Drizzle` and `Thunderstorm`.
    #[default]
    Strict,
}

impl RainDetection {
    const PRECIPITATION: [&'static str; 3] = ["Rain", "Drizzle", "Thunderstorm"];

    pub fn matches(&self, label: &str) -> bool {
        match self {
            RainDetection::Strict => Self::PRECIPITATION.contains(&label),
            RainDetection::Lenient => {
                let lower = label.to_lowercase();
                Self::PRECIPITATION
                    .iter()
                    .any(|p| lower.contains(&p.to_lowercase()))
            }
        }
    }

    pub fn any<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> bool {
        labels.into_iter().any(|label| self.matches(label))
    }
}

/// Current conditions at the requested coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub condition: String,
    pub rain_expected: bool,
    pub location_name: String,
    pub observation_time: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Build a snapshot, deriving the rain flag from the condition label.
    pub fn new(
        temperature_c: f64,
        humidity_pct: f64,
        condition: impl Into<String>,
        detection: RainDetection,
    ) -> Self {
        let condition = condition.into();
        Self {
            temperature_c,
            humidity_pct,
            rain_expected: detection.matches(&condition),
            condition,
            location_name: String::new(),
            observation_time: Utc::now(),
        }
    }

    /// One-line restatement of the conditions, appended to every advisory.
    pub fn summary(&self) -> String {
        let place = if self.location_name.is_empty() {
            String::new()
        } else {
            format!(" in {}", self.location_name)
        };

        format!(
            "Current conditions{place}: {:.1}°C, {:.0}% humidity, {} (rain expected: {}).",
            self.temperature_c,
            self.humidity_pct,
            self.condition,
            if self.rain_expected { "yes" } else { "no" },
        )
    }
}

/// Which strategy produced an advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorySource {
    Rules,
    Generative,
}

#[derive(Debug, Clone, Serialize)]
pub struct Advisory {
    pub text: String,
    pub source: AdvisorySource,
}

/// Everything a strategy needs to compose an advisory.
#[derive(Debug, Clone)]
pub struct AdvisoryInput {
    pub crop: String,
    pub soil_moisture: f64,
    pub weather: WeatherSnapshot,
}
