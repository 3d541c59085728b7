//! Status output and persistence for activity reports.
//!
//! Supports a JSON status line on stdout and CSV append.

use anyhow::Result;
use tracing::debug;

use crate::report::ActivityReport;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Renders a report as a single JSON status line.
pub fn status_line(report: &ActivityReport) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}

/// Prints the status line for a report to stdout.
pub fn print_report(report: &ActivityReport) -> Result<()> {
    println!("{}", status_line(report)?);
    Ok(())
}

/// Appends an [`ActivityReport`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, report: &ActivityReport) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(report)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_status_line_has_activity() {
        let report = ActivityReport {
            activity: 4.0,
            local_time: "09:20".to_string(),
            ..Default::default()
        };
        let line = status_line(&report).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["activity"], 4.0);
        assert_eq!(parsed["local_time"], "09:20");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_print_report_does_not_panic() {
        print_report(&ActivityReport::default()).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("hospital_bike_activity_test_header.csv");
        let _ = fs::remove_file(&path);

        let report = ActivityReport::default();
        append_record(&path, &report).unwrap();
        append_record(&path, &report).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
