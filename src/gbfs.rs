//! GBFS station feeds: payload types and a retrying feed client.
//!
//! Transport failures (request errors and non-200 responses) are retried
//! with the client's shared [`Backoff`]. Payload errors (a 200 with the wrong
//! shape) propagate without a retry.

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error};

use crate::backoff::{Backoff, RetryPolicy};
use crate::fetch::{HttpClient, fetch_bytes};

pub const STATION_INFORMATION_URL: &str =
    "https://gbfs.citibikenyc.com/gbfs/en/station_information.json";
pub const STATION_STATUS_URL: &str = "https://gbfs.citibikenyc.com/gbfs/en/station_status.json";

/// Station-status field holding the bike count.
pub const NUM_BIKES_AVAILABLE: &str = "num_bikes_available";

/// One entry of `station_information.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationInformation {
    #[serde(deserialize_with = "station_id")]
    pub station_id: String,
    pub lat: f64,
    pub lon: f64,
}

/// One `(station_id, value)` pair from `station_status.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationReading {
    pub station_id: String,
    pub value: i64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: StationList<T>,
}

#[derive(Deserialize)]
struct StationList<T> {
    stations: Vec<T>,
}

// Some GBFS publishers emit numeric IDs.
fn station_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    station_id_from_value(&Value::deserialize(d)?).map_err(D::Error::custom)
}

fn station_id_from_value(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("invalid station_id: {other}")),
    }
}

/// Client for the two station feeds of one GBFS system.
///
/// Both feeds share one [`Backoff`], so repeated failures on either feed
/// lengthen the wait for the other.
pub struct GbfsClient<C> {
    http: C,
    information_url: Url,
    status_url: Url,
    backoff: Backoff,
    retry: RetryPolicy,
}

impl<C: HttpClient> GbfsClient<C> {
    pub fn new(http: C, information_url: &str, status_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            information_url: information_url
                .parse()
                .with_context(|| format!("invalid station information URL '{information_url}'"))?,
            status_url: status_url
                .parse()
                .with_context(|| format!("invalid station status URL '{status_url}'"))?,
            backoff: Backoff::new(),
            retry: RetryPolicy::Forever,
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    /// Fetches every station in the system with its coordinates.
    #[tracing::instrument(skip(self), fields(url = %self.information_url))]
    pub async fn station_information(&mut self) -> Result<Vec<StationInformation>> {
        let url = self.information_url.clone();
        let bytes = self.fetch_with_retry(&url).await?;
        let envelope: Envelope<StationInformation> =
            serde_json::from_slice(&bytes).context("malformed station information payload")?;

        debug!(stations = envelope.data.stations.len(), "Station information fetched");
        Ok(envelope.data.stations)
    }

    /// Fetches `field` for every station in `keys`.
    ///
    /// Readings come back in feed-response order, not in the order of `keys`,
    /// and a station the feed doesn't mention is simply absent.
    #[tracing::instrument(skip(self, keys), fields(url = %self.status_url, keys = keys.len()))]
    pub async fn live_values(&mut self, keys: &[String], field: &str) -> Result<Vec<StationReading>> {
        let url = self.status_url.clone();
        let bytes = self.fetch_with_retry(&url).await?;
        let envelope: Envelope<Value> =
            serde_json::from_slice(&bytes).context("malformed station status payload")?;

        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let mut readings = Vec::new();

        for entry in &envelope.data.stations {
            let raw_id = entry
                .get("station_id")
                .context("station status entry without station_id")?;
            let station_id = station_id_from_value(raw_id).map_err(anyhow::Error::msg)?;
            if !wanted.contains(station_id.as_str()) {
                continue;
            }

            let Some(value) = entry.get(field).and_then(Value::as_i64) else {
                bail!("station {station_id} has no integer '{field}'");
            };
            readings.push(StationReading { station_id, value });
        }

        debug!(readings = readings.len(), "Station status fetched");
        Ok(readings)
    }

    async fn fetch_with_retry(&mut self, url: &Url) -> Result<Vec<u8>> {
        let mut failures = 0u32;

        loop {
            match fetch_bytes(&self.http, url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    failures += 1;
                    if !self.retry.allows_retry(failures) {
                        return Err(e.context(format!("giving up on {url} after {failures} attempts")));
                    }

                    let delay = self.backoff.next_delay();
                    error!(
                        error = %e,
                        attempt = failures,
                        delay_secs = delay.as_secs_f64(),
                        "Connection error, reconnecting"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
