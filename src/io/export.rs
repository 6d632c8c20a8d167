//! Dataset and result exports.
//!
//! Generated datasets are written in the same whitespace format the readers in
//! [`crate::io::ingest`] accept, with 16 decimal places per value. Fit results
//! are exported as pretty-printed JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;

use crate::domain::{DecayEvents, FitConfig, FitReport, FitSummary, LineData};
use crate::error::AppError;

/// One record per line, values separated by a single space.
pub fn format_records<'a>(rows: impl IntoIterator<Item = &'a [f64]>) -> String {
    let mut out = String::new();
    for row in rows {
        let parts: Vec<String> = row.iter().map(|v| format!("{v:.16}")).collect();
        out.push_str(&parts.join(" "));
        out.push('\n');
    }
    out
}

fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create data file '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write data file '{}': {e}", path.display())))
}

/// Write `(time, angle)` records.
pub fn write_decay_events(path: &Path, events: &DecayEvents) -> Result<(), AppError> {
    let rows: Vec<[f64; 2]> = events.times.iter().zip(&events.angles).map(|(&t, &a)| [t, a]).collect();
    write_text(path, &format_records(rows.iter().map(|r| r.as_slice())))
}

/// Write `(x, y, error)` records.
pub fn write_line_data(path: &Path, data: &LineData) -> Result<(), AppError> {
    let rows: Vec<[f64; 3]> = (0..data.len()).map(|i| [data.x[i], data.y[i], data.y_err[i]]).collect();
    write_text(path, &format_records(rows.iter().map(|r| r.as_slice())))
}

/// Write one decay time per line.
pub fn write_lifetimes(path: &Path, times: &[f64]) -> Result<(), AppError> {
    write_text(path, &format_records(times.chunks(1)))
}

/// Wrap a summary with run metadata for export.
pub fn build_fit_report(summary: &FitSummary, config: &FitConfig) -> FitReport {
    FitReport {
        tool: "decay-fit".to_string(),
        generated_at: Utc::now(),
        data_path: config.data_path.clone(),
        threshold: config.threshold,
        profile: (!config.skip_profile).then_some(config.profile),
        summary: summary.clone(),
    }
}

/// Write a fit report JSON file.
pub fn write_fit_report_json(path: &Path, summary: &FitSummary, config: &FitConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    let report = build_fit_report(summary, config);
    serde_json::to_writer_pretty(file, &report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    tracing::info!(path = %path.display(), "wrote fit report");
    Ok(())
}
