use anyhow::{Context, Result};

use super::KeyStore;

/// Resolves secrets from environment variables.
pub struct EnvKeyStore;

#[async_trait::async_trait]
impl KeyStore for EnvKeyStore {
    /// Returns the trimmed value of the variable named `reference`.
    async fn get(&self, reference: &str) -> Result<String> {
        let value = std::env::var(reference)
            .with_context(|| format!("environment variable '{reference}' is not set"))?;
        Ok(value.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_variable_is_an_error() {
        let store = EnvKeyStore;
        let err = store
            .get("HOSPITAL_BIKE_ACTIVITY_TEST_UNSET_VARIABLE")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }

    #[tokio::test]
    async fn test_reads_path_variable() {
        // PATH is set in any test environment.
        let store = EnvKeyStore;
        assert!(!store.get("PATH").await.unwrap().is_empty());
    }
}
