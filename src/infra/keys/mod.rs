//! Write-key management.
//!
//! [`KeyStore`] is the async trait for resolving a reference into its plaintext value.
//! [`EnvKeyStore`] implements [`KeyStore`] using process environment variables
//! (including anything `dotenvy` loaded from `.env`).

mod env;

pub use env::EnvKeyStore;

use anyhow::Result;

/// Environment variable holding the microprediction write key.
pub const WRITE_KEY_VAR: &str = "TRAFFIC_WRITE_KEY";

/// Resolves a reference (e.g. an environment variable name) into a plaintext secret.
#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, reference: &str) -> Result<String>;
}
