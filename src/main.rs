//! CLI entry point for the hospital bike activity publisher.
//!
//! Resolves Citi Bike stations near Manhattan hospitals, measures how much
//! their bike counts churn over a sampling window, and publishes the result
//! to a microprediction live stream.

mod infra;

use crate::infra::keys::{EnvKeyStore, KeyStore, WRITE_KEY_VAR};
use crate::infra::microprediction::client::MicroWriter;
use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use hospital_bike_activity::activity::{self, SamplingWindow};
use hospital_bike_activity::backoff::RetryPolicy;
use hospital_bike_activity::fetch::BasicClient;
use hospital_bike_activity::gbfs::{GbfsClient, STATION_INFORMATION_URL, STATION_STATUS_URL};
use hospital_bike_activity::publisher::{PublisherConfig, STREAM_NAME, run_publisher};
use hospital_bike_activity::stations::{HOSPITAL_BOXES, resolve_station_ids, stations_in_boxes};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hospital_bike_activity")]
#[command(about = "Publishes bike-share churn near Manhattan hospitals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FeedArgs {
    /// GBFS station_information.json URL
    #[arg(long, default_value = STATION_INFORMATION_URL)]
    station_info_url: String,

    /// GBFS station_status.json URL
    #[arg(long, default_value = STATION_STATUS_URL)]
    station_status_url: String,

    /// Give up on a feed after this many failed attempts (0 = retry forever)
    #[arg(long, default_value_t = 0)]
    max_attempts: u32,

    /// List a station once even if it lies in several catchment areas
    #[arg(long, default_value_t = false)]
    dedupe_stations: bool,
}

#[derive(Args)]
struct WindowArgs {
    /// Length of one sampling window, in minutes
    #[arg(short = 'w', long, default_value_t = 20)]
    window_minutes: u64,

    /// Time between station-status samples, in seconds
    #[arg(short = 't', long, default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
    tick_seconds: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample and publish activity windows back to back
    Run {
        #[command(flatten)]
        feed: FeedArgs,

        #[command(flatten)]
        window: WindowArgs,

        /// Number of windows to publish (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        iterations: usize,

        /// Stream name to publish under
        #[arg(long, default_value = STREAM_NAME)]
        stream_name: String,

        /// IANA timezone used for the status line
        #[arg(long, default_value = "America/Los_Angeles")]
        timezone: String,

        /// Optional: CSV file to append each report to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Resolve and list the stations inside the hospital catchment areas
    Stations {
        #[command(flatten)]
        feed: FeedArgs,
    },
    /// Measure one activity window without publishing it
    Sample {
        #[command(flatten)]
        feed: FeedArgs,

        #[command(flatten)]
        window: WindowArgs,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            feed,
            window,
            iterations,
            stream_name,
            timezone,
            output,
        } => {
            let timezone: Tz = timezone
                .parse()
                .map_err(|e| anyhow!("unknown timezone '{timezone}': {e}"))?;

            // Credentials are checked before any feed traffic.
            let write_key = EnvKeyStore
                .get(WRITE_KEY_VAR)
                .await
                .context("You need to set the write key for this example to work")?;
            let writer = MicroWriter::new(write_key)?;

            let mut client = feed_client(&feed)?;
            let station_ids =
                resolve_station_ids(&mut client, HOSPITAL_BOXES, feed.dedupe_stations).await?;
            println!("Station IDs: {:?}", station_ids);

            let config = PublisherConfig {
                name: stream_name,
                window: sampling_window(&window)?,
                timezone,
                iterations,
                output,
            };
            run_publisher(&mut client, &writer, &station_ids, &config).await?;
        }
        Commands::Stations { feed } => {
            let mut client = feed_client(&feed)?;
            let stations = client.station_information().await?;

            for area in HOSPITAL_BOXES {
                let ids = stations_in_boxes(&stations, std::slice::from_ref(area), false);
                info!(area = area.name, count = ids.len(), station_ids = ?ids, "Catchment area");
            }

            let ids = stations_in_boxes(&stations, HOSPITAL_BOXES, feed.dedupe_stations);
            info!(total = stations.len(), resolved = ids.len(), "Station list summary");
            println!("Station IDs: {:?}", ids);
        }
        Commands::Sample { feed, window } => {
            let mut client = feed_client(&feed)?;
            let station_ids =
                resolve_station_ids(&mut client, HOSPITAL_BOXES, feed.dedupe_stations).await?;

            let window = sampling_window(&window)?;
            info!(
                stations = station_ids.len(),
                expected_ticks = window.expected_ticks(),
                "Starting sample window"
            );
            let sample = activity::hospital_bike_activity(&mut client, &station_ids, window).await?;
            println!("activity: {} ({} ticks)", sample.activity, sample.ticks);
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/hospital_bike_activity.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hospital_bike_activity.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

fn feed_client(feed: &FeedArgs) -> Result<GbfsClient<BasicClient>> {
    Ok(
        GbfsClient::new(BasicClient::new(), &feed.station_info_url, &feed.station_status_url)?
            .with_retry_policy(RetryPolicy::from_max_attempts(feed.max_attempts)),
    )
}

fn sampling_window(args: &WindowArgs) -> Result<SamplingWindow> {
    SamplingWindow::new(
        Duration::from_secs(args.window_minutes * 60),
        Duration::from_secs(args.tick_seconds),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["hospital_bike_activity", "run"]).unwrap();
        let Commands::Run {
            feed,
            window,
            iterations,
            stream_name,
            timezone,
            output,
        } = cli.command
        else {
            panic!("expected run");
        };

        assert_eq!(feed.station_info_url, STATION_INFORMATION_URL);
        assert_eq!(feed.max_attempts, 0);
        assert!(!feed.dedupe_stations);
        assert_eq!(iterations, 0);
        assert_eq!(stream_name, STREAM_NAME);
        assert_eq!(timezone, "America/Los_Angeles");
        assert!(output.is_none());
        assert_eq!(sampling_window(&window).unwrap(), SamplingWindow::default());
    }

    #[test]
    fn test_zero_tick_is_rejected_by_cli() {
        let result = Cli::try_parse_from(["hospital_bike_activity", "sample", "--tick-seconds", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_feed_client_rejects_bad_url() {
        let cli = Cli::try_parse_from([
            "hospital_bike_activity",
            "stations",
            "--station-info-url",
            "nope",
        ])
        .unwrap();
        let Commands::Stations { feed } = cli.command else {
            panic!("expected stations");
        };
        assert!(feed_client(&feed).is_err());
    }
}
