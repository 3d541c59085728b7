//! Trait for submitting live values to a prediction-collection service.

use anyhow::Result;

/// Abstraction over a write API that accepts named scalar observations
/// (e.g., microprediction).
#[async_trait::async_trait]
pub trait PredictionApi {
    /// Submits `value` to the stream `name` and returns the raw response body.
    ///
    /// The body is opaque: callers report it, they don't interpret it.
    async fn set(&self, name: &str, value: f64) -> Result<String>;
}
