use async_trait::async_trait;
use tracing::warn;

use crate::{
    error::Result,
    model::{Advisory, AdvisoryInput},
};

use super::AdvisoryStrategy;

/// Runs `primary`, and on any failure answers with `fallback` instead.
#[derive(Debug, Clone)]
pub struct FallbackStrategy<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackStrategy<P, F>
where
    P: AdvisoryStrategy,
    F: AdvisoryStrategy,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P, F> AdvisoryStrategy for FallbackStrategy<P, F>
where
    P: AdvisoryStrategy,
    F: AdvisoryStrategy,
{
    async fn advise(&self, input: &AdvisoryInput) -> Result<Advisory> {
        match self.primary.advise(input).await {
            Ok(advisory) => Ok(advisory),
            Err(e) => {
                warn!(
                    error = %e,
                    crop = %input.crop,
                    "primary advisory strategy failed, falling back"
                );
                self.fallback.advise(input).await
            }
        }
    }
}
