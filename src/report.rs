use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::activity::ActivitySample;

/// Status record for one published sampling window.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ActivityReport {
    pub timestamp: DateTime<Utc>,
    /// `HH:MM` in the display timezone.
    pub local_time: String,
    pub name: String,
    pub activity: f64,
    pub ticks: u32,
    pub stations: usize,

    // write API outcome
    pub response: Option<String>,
    pub error_message: Option<String>,
}

impl ActivityReport {
    pub fn new(
        name: &str,
        sample: ActivitySample,
        stations: usize,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        ActivityReport {
            timestamp: now,
            local_time: local_time(now, tz),
            name: name.to_string(),
            activity: sample.activity,
            ticks: sample.ticks,
            stations,
            ..Default::default()
        }
    }

    /// Record whatever the write API answered.
    pub fn with_response(mut self, response: String) -> Self {
        self.response = Some(response);
        self
    }

    /// Record a failed write.
    pub fn with_error(mut self, error_message: &str) -> Self {
        self.error_message = Some(error_message.to_string());
        self
    }
}

/// Formats `now` as `HH:MM` in `tz`.
pub fn local_time(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%H:%M").to_string()
}
