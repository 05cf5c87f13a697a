use crate::error::CliError;
use chrono::{DateTime, Utc};
use engine_core::report::{RunOutcome, RunReport};
use serde_json::json;

pub fn print_report(report: &RunReport, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report_table(report);
    }
    Ok(())
}

fn print_report_table(report: &RunReport) {
    let outcome = match report.outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::SourceClosed => "skipped (source closed)",
    };
    println!("Import '{}' ({}): {}", report.job, report.kind, outcome);
    println!("-----------------------------");
    if let Some(window) = &report.window {
        let formatted = window.format_for_query();
        println!("{:<20} [{}, {})", "Window", formatted.start, formatted.end);
    }
    println!("{:<20} {}", "Rows read", report.rows_read);
    println!("{:<20} {}", "Written", report.written);
    println!(
        "{:<20} {} (missing field {}, invalid timestamp {}, malformed meta {})",
        "Skipped",
        report.skipped_count(),
        report.skipped.missing_field,
        report.skipped.invalid_timestamp,
        report.skipped.malformed_meta
    );
    println!(
        "{:<20} {}",
        "Previous watermark",
        display_time(report.previous_watermark)
    );
    println!("{:<20} {}", "Watermark", display_time(report.watermark));
    for skipped in &report.skip_samples {
        println!("  row {}: {}", skipped.index, skipped.reason);
    }
}

pub fn print_watermark(
    job: &str,
    watermark: Option<DateTime<Utc>>,
    as_json: bool,
) -> Result<(), CliError> {
    if as_json {
        let value = json!({ "job": job, "last_update": watermark });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{:<20} {}", job, display_time(watermark));
    }
    Ok(())
}

fn display_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string())
}
