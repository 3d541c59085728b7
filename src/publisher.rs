//! The sample-and-publish loop.

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use tracing::{error, info};

use crate::activity::{SamplingWindow, hospital_bike_activity};
use crate::fetch::HttpClient;
use crate::gbfs::GbfsClient;
use crate::output::{append_record, print_report};
use crate::report::ActivityReport;
use crate::services::prediction_api::PredictionApi;

/// Stream the activity value is published under.
pub const STREAM_NAME: &str = "hospital_bike_activity.json";

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub name: String,
    pub window: SamplingWindow,
    pub timezone: Tz,
    /// Number of windows to publish (0 = infinite).
    pub iterations: usize,
    /// Optional CSV file each report is appended to.
    pub output: Option<String>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            name: STREAM_NAME.to_string(),
            window: SamplingWindow::default(),
            timezone: chrono_tz::America::Los_Angeles,
            iterations: 0,
            output: None,
        }
    }
}

/// Samples one window at a time and submits each result, back to back.
///
/// A failed write is reported and the loop carries on. Feed errors that
/// escape the client's retry policy end the loop.
#[tracing::instrument(skip_all, fields(name = %config.name, iterations = config.iterations))]
pub async fn run_publisher<C: HttpClient, W: PredictionApi>(
    client: &mut GbfsClient<C>,
    writer: &W,
    station_ids: &[String],
    config: &PublisherConfig,
) -> Result<Vec<ActivityReport>> {
    let mut reports = Vec::new();
    let mut published = 0;

    loop {
        if config.iterations > 0 && published >= config.iterations {
            break;
        }
        published += 1;

        let sample = hospital_bike_activity(client, station_ids, config.window).await?;
        let report = ActivityReport::new(
            &config.name,
            sample,
            station_ids.len(),
            Utc::now(),
            config.timezone,
        );

        let report = match writer.set(&config.name, sample.activity).await {
            Ok(response) => {
                info!(activity = sample.activity, response = %response, "Activity published");
                report.with_response(response)
            }
            Err(e) => {
                error!(error = %e, activity = sample.activity, "Failed to publish activity");
                report.with_error(&e.to_string())
            }
        };

        print_report(&report)?;
        if let Some(path) = &config.output {
            if let Err(e) = append_record(path, &report) {
                error!(path = %path, error = %e, "Failed to append activity report");
            }
        }

        // Only finite runs hand their reports back.
        if config.iterations > 0 {
            reports.push(report);
        }
    }

    info!(published, "Publisher finished");
    Ok(reports)
}
