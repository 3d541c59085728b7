use anyhow::{Result, bail};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use hospital_bike_activity::fetch::{BasicClient, HttpClient};
use hospital_bike_activity::services::prediction_api::PredictionApi;

pub const DEFAULT_BASE_URL: &str = "https://api.microprediction.org";

/// Writer for microprediction live streams.
pub struct MicroWriter<C> {
    http: C,
    base_url: String,
    write_key: String,
    // Only used to assemble requests; `http` sends them.
    builder: reqwest::Client,
}

impl MicroWriter<BasicClient> {
    pub fn new(write_key: String) -> Result<Self> {
        let http = BasicClient::with_timeouts(Duration::from_secs(30), Duration::from_secs(10))?;
        Self::with_client(http, write_key, DEFAULT_BASE_URL)
    }
}

impl<C: HttpClient> MicroWriter<C> {
    pub fn with_client(http: C, write_key: String, base_url: &str) -> Result<Self> {
        validate_write_key(&write_key)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            write_key,
            builder: reqwest::Client::new(),
        })
    }

    fn live_url(&self, name: &str) -> String {
        format!("{}/live/{}", self.base_url, name)
    }

    /// `PUT {base}/live/{name}` with `write_key` and `value` as form fields.
    fn write_request(&self, name: &str, value: f64) -> Result<reqwest::Request> {
        let value = value.to_string();
        let req = self
            .builder
            .put(self.live_url(name))
            .form(&[("write_key", self.write_key.as_str()), ("value", value.as_str())])
            .build()?;
        Ok(req)
    }
}

/// Write keys are hex strings.
fn validate_write_key(write_key: &str) -> Result<()> {
    if write_key.is_empty() || !write_key.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("You need to set the write key for this example to work");
    }
    Ok(())
}

#[async_trait]
impl<C: HttpClient> PredictionApi for MicroWriter<C> {
    async fn set(&self, name: &str, value: f64) -> Result<String> {
        let req = self.write_request(name, value)?;

        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send write request: {}", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(status = %status, body = %body, "Write API returned non-success status");
        }

        Ok(body)
    }
}
