use thiserror::Error;

/// Failures the advisor can report to its callers.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The request is missing a field or carries an unusable value.
    #[error("{0}")]
    Validation(String),

    /// The weather provider could not produce a snapshot.
    #[error("Weather provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The generative-text provider failed. Recovered by the rule fallback.
    #[error("Generative provider unavailable: {0}")]
    GenerativeUnavailable(String),
}

impl AdvisorError {
    pub fn is_validation(&self) -> bool {
        matches!(self, AdvisorError::Validation(_))
    }
}

pub type Result<T, E = AdvisorError> = std::result::Result<T, E>;
