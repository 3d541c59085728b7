//! Bike-count churn ("activity") over a sampling window.

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::fetch::HttpClient;
use crate::gbfs::{GbfsClient, NUM_BIKES_AVAILABLE, StationReading};

/// Bike counts keyed by station ID at one point in time.
pub type Snapshot = HashMap<String, i64>;

pub fn snapshot(readings: Vec<StationReading>) -> Snapshot {
    readings
        .into_iter()
        .map(|r| (r.station_id, r.value))
        .collect()
}

/// Sum of `|curr[id] - prev[id]|` over `station_ids`.
///
/// IDs listed more than once count more than once. An ID missing from either
/// snapshot contributes nothing.
pub fn tick_activity(station_ids: &[String], prev: &Snapshot, curr: &Snapshot) -> f64 {
    station_ids
        .iter()
        .filter_map(|id| Some(curr.get(id)?.abs_diff(*prev.get(id)?)))
        .map(|delta| delta as f64)
        .sum()
}

/// How long to sample and how often.
///
/// The deadline is checked before each sleep, so a window overshoots by up
/// to one tick (plus fetch and backoff time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    pub window: Duration,
    pub tick: Duration,
}

impl SamplingWindow {
    pub fn new(window: Duration, tick: Duration) -> Result<Self> {
        if tick.is_zero() {
            bail!("sampling tick must be positive");
        }
        Ok(Self { window, tick })
    }

    /// Ticks taken when fetches are instantaneous.
    pub fn expected_ticks(&self) -> u32 {
        let ticks = self.window.as_nanos().div_ceil(self.tick.as_nanos());
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

impl Default for SamplingWindow {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(20 * 60),
            tick: Duration::from_secs(2 * 60),
        }
    }
}

/// Result of one sampling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivitySample {
    pub activity: f64,
    pub ticks: u32,
}

/// Samples bike counts at `station_ids` every tick until the window closes
/// and returns the accumulated churn.
#[tracing::instrument(skip(client, station_ids), fields(stations = station_ids.len(), window_secs = window.window.as_secs()))]
pub async fn hospital_bike_activity<C: HttpClient>(
    client: &mut GbfsClient<C>,
    station_ids: &[String],
    window: SamplingWindow,
) -> Result<ActivitySample> {
    let mut prev = snapshot(client.live_values(station_ids, NUM_BIKES_AVAILABLE).await?);
    let deadline = Instant::now() + window.window;
    let mut activity = 0.0;
    let mut ticks = 0;

    while Instant::now() < deadline {
        tokio::time::sleep(window.tick).await;
        let curr = snapshot(client.live_values(station_ids, NUM_BIKES_AVAILABLE).await?);

        let delta = tick_activity(station_ids, &prev, &curr);
        activity += delta;
        ticks += 1;
        debug!(tick = ticks, delta, activity, "Sampled station status");

        prev = curr;
    }

    info!(activity, ticks, "Sampling window closed");
    Ok(ActivitySample { activity, ticks })
}
