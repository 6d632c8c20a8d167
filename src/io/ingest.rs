//! Plain-text dataset ingest.
//!
//! Every dataset is whitespace-separated floats, one record per line, no header:
//!
//! - 1 column: decay times (`lifetime`)
//! - 2 columns: decay time and emission angle (`decay`)
//! - 3 columns: `x`, `y` and the error on `y` (`line`)
//!
//! Blank lines are skipped. Anything else that does not parse is an error naming
//! the offending line (exit code 2). A file with no records is exit code 3.

use std::path::Path;

use crate::domain::{DecayEvents, LineData};
use crate::error::AppError;

/// Parse `text` into `columns` column vectors.
///
/// `source` names the input in error messages.
pub fn parse_columns(text: &str, columns: usize, source: &str) -> Result<Vec<Vec<f64>>, AppError> {
    let mut out: Vec<Vec<f64>> = vec![Vec::new(); columns];
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != columns {
            return Err(AppError::new(
                2,
                format!(
                    "{source}:{line}: expected {columns} column(s), found {}.",
                    tokens.len()
                ),
            ));
        }
        for (col, token) in tokens.iter().enumerate() {
            let value: f64 = token
                .parse()
                .map_err(|e| AppError::new(2, format!("{source}:{line}: cannot parse '{token}': {e}")))?;
            if !value.is_finite() {
                return Err(AppError::new(2, format!("{source}:{line}: value '{token}' is not finite.")));
            }
            out[col].push(value);
        }
    }

    if out.first().is_none_or(|c| c.is_empty()) {
        return Err(AppError::new(3, format!("{source}: no records found.")));
    }
    Ok(out)
}

/// Read a dataset file with a fixed column count.
pub fn read_columns(path: &Path, columns: usize) -> Result<Vec<Vec<f64>>, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read data file '{}': {e}", path.display())))?;
    let data = parse_columns(&text, columns, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), records = data[0].len(), columns, "read dataset");
    Ok(data)
}

/// Build [`LineData`] from parsed `(x, y, error)` columns.
pub fn line_data_from_columns(columns: Vec<Vec<f64>>) -> Result<LineData, AppError> {
    let mut it = columns.into_iter();
    let (Some(x), Some(y), Some(y_err), None) = (it.next(), it.next(), it.next(), it.next()) else {
        return Err(AppError::new(2, "Line data needs exactly 3 columns."));
    };
    if let Some(i) = y_err.iter().position(|&e| e <= 0.0) {
        return Err(AppError::new(
            2,
            format!("Record {}: error column must be > 0 (got {}).", i + 1, y_err[i]),
        ));
    }
    Ok(LineData { x, y, y_err })
}

/// Read a 3-column `(x, y, error)` file.
pub fn read_line_data(path: &Path) -> Result<LineData, AppError> {
    line_data_from_columns(read_columns(path, 3)?)
}

/// Read a 2-column `(time, angle)` file.
pub fn read_decay_events(path: &Path) -> Result<DecayEvents, AppError> {
    let mut it = read_columns(path, 2)?.into_iter();
    let (Some(times), Some(angles)) = (it.next(), it.next()) else {
        return Err(AppError::new(2, "Decay data needs exactly 2 columns."));
    };
    Ok(DecayEvents { times, angles })
}

/// Read a 1-column file of decay times.
pub fn read_lifetimes(path: &Path) -> Result<Vec<f64>, AppError> {
    let times = read_columns(path, 1)?.into_iter().next().unwrap_or_default();
    if let Some(i) = times.iter().position(|&t| t < 0.0) {
        return Err(AppError::new(
            2,
            format!("Record {}: decay time must be >= 0 (got {}).", i + 1, times[i]),
        ));
    }
    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_columns_and_skips_blank_lines() {
        let text = "0.1 1.0 0.05\n\n   \n0.2\t0.9   0.05\n";
        let cols = parse_columns(text, 3, "mem").unwrap();
        assert_eq!(cols[0], vec![0.1, 0.2]);
        assert_eq!(cols[1], vec![1.0, 0.9]);
        assert_eq!(cols[2], vec![0.05, 0.05]);
    }

    #[test]
    fn wrong_column_count_names_the_line() {
        let err = parse_columns("1 2\n3\n", 2, "events.txt").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("events.txt:2"), "message: {err}");
    }

    #[test]
    fn bad_tokens_are_rejected() {
        let err = parse_columns("1.0\nabc\n", 1, "t").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("t:2"), "message: {err}");
        let err = parse_columns("1.0\nNaN\n", 1, "t").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_input_is_exit_code_3() {
        let err = parse_columns("\n \n", 2, "empty").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn line_data_requires_positive_errors() {
        let cols = parse_columns("0 1 0.1\n1 2 0\n", 3, "line").unwrap();
        assert_eq!(line_data_from_columns(cols).unwrap_err().exit_code(), 2);
        let cols = parse_columns("0 1 0.1\n1 2 0.2\n", 3, "line").unwrap();
        let data = line_data_from_columns(cols).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.y_err, vec![0.1, 0.2]);
    }

    #[test]
    fn missing_file_is_exit_code_2() {
        let err = read_lifetimes(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
