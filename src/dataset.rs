//! Dataset loading: the primary metrics table, the secondary testing table
//! and the latest-snapshot table derived from it.
//!
//! Files are read with every column as text, validated against the required
//! column set, then converted: `date` to a polars `Date`, numeric columns to
//! `Float64`. Any failure aborts the whole load.

use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::config::DashboardConfig;
use crate::error::{DashError, Result};
use crate::schema::{location, metrics, testing};
use crate::snapshot;

pub const METRICS_TABLE: &str = "metrics";
pub const TESTING_TABLE: &str = "testing";

/// The three immutable tables every chart reads from.
#[derive(Debug, Clone)]
pub struct Datasets {
    metrics: DataFrame,
    testing: DataFrame,
    snapshot: DataFrame,
}

impl Datasets {
    /// Load both files named by the config and derive the latest snapshot.
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let raw_metrics = read_csv_as_strings(&config.metrics_path())?;
        let raw_testing = read_csv_as_strings(&config.testing_path())?;
        Self::from_frames(raw_metrics, raw_testing, &config.date_format)
    }

    /// Build from raw all-text frames, as read from disk.
    pub fn from_frames(
        raw_metrics: DataFrame,
        raw_testing: DataFrame,
        date_format: &str,
    ) -> Result<Self> {
        let metrics = normalize_metrics(raw_metrics, date_format)?;
        let testing = normalize_testing(raw_testing, date_format)?;
        let snapshot = snapshot::latest_snapshot(&testing)?;

        tracing::info!(
            metrics_rows = metrics.height(),
            testing_rows = testing.height(),
            snapshot_rows = snapshot.height(),
            "Datasets loaded"
        );

        Ok(Self {
            metrics,
            testing,
            snapshot,
        })
    }

    pub fn metrics(&self) -> &DataFrame {
        &self.metrics
    }

    pub fn testing(&self) -> &DataFrame {
        &self.testing
    }

    pub fn snapshot(&self) -> &DataFrame {
        &self.snapshot
    }
}

// ── Table normalization ─────────────────────────────────────────────────────

fn normalize_metrics(raw: DataFrame, date_format: &str) -> Result<DataFrame> {
    let mut required = vec![location::CONTINENT, location::COUNTRY, location::DATE];
    required.extend(metrics::NUMERIC);
    require_columns(&raw, METRICS_TABLE, &required)?;

    let df = parse_date_column(raw, METRICS_TABLE, date_format)?;
    parse_float_columns(df, &metrics::NUMERIC)
}

fn normalize_testing(raw: DataFrame, date_format: &str) -> Result<DataFrame> {
    let mut required = vec![location::CONTINENT, location::COUNTRY, location::DATE];
    required.extend(testing::NUMERIC);
    require_columns(&raw, TESTING_TABLE, &required)?;

    let df = parse_date_column(raw, TESTING_TABLE, date_format)?;
    let df = parse_float_columns(df, &testing::NUMERIC)?;

    let df = df
        .lazy()
        .with_columns([(col(testing::NEW_TESTS) * col(testing::POSITIVE_RATE))
            .alias(testing::POSITIVE_TESTS)])
        .collect()?;
    Ok(df)
}

// ── CSV and schema helpers ──────────────────────────────────────────────────

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(DashError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("data file not found: {}", path.display()),
        )));
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    tracing::debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Read CSV");
    Ok(df)
}

fn require_columns(df: &DataFrame, table: &'static str, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(DashError::Schema {
                table,
                column: col_name.to_string(),
            });
        }
    }
    Ok(())
}

/// Parse the string `date` column to Date. Cells may carry a trailing
/// `%H:%M:%S` time, as spreadsheet exports do; the time is dropped. Empty or
/// malformed cells fail the load with the first offending row.
fn parse_date_column(df: DataFrame, table: &'static str, format: &str) -> Result<DataFrame> {
    let raw = df.column(location::DATE)?.str()?.clone();

    let text = col(location::DATE).str().strip_chars(lit(" \t\r\n"));
    let date_only = text.clone().str().to_date(StrptimeOptions {
        format: Some(format.into()),
        strict: false,
        ..Default::default()
    });
    let with_time = text
        .str()
        .to_datetime(
            Some(TimeUnit::Microseconds),
            None,
            StrptimeOptions {
                format: Some(format!("{format} %H:%M:%S").into()),
                strict: false,
                ..Default::default()
            },
            lit("raise"),
        )
        .cast(DataType::Date);

    let parsed = df
        .lazy()
        .with_columns([when(date_only.clone().is_not_null())
            .then(date_only)
            .otherwise(with_time)
            .alias(location::DATE)])
        .collect()?;

    let dates = parsed.column(location::DATE)?;
    if dates.null_count() > 0 {
        let missing = dates.as_materialized_series().is_null();
        let row = (&missing)
            .into_iter()
            .position(|v| v == Some(true))
            .unwrap_or_default();
        return Err(DashError::Parse {
            table,
            column: location::DATE.to_string(),
            row,
            value: raw.get(row).unwrap_or("").to_string(),
        });
    }

    Ok(parsed)
}

fn parse_float_columns(df: DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let exprs: Vec<Expr> = columns
        .iter()
        .map(|c| {
            col(*c)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .cast(DataType::Float64)
        })
        .collect();
    Ok(df.lazy().with_columns(exprs).collect()?)
}

// ── Column readers ──────────────────────────────────────────────────────────

pub(crate) fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    Ok(df.column(name)?.date()?.as_date_iter().collect())
}

pub(crate) fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(df.column(name)?.f64()?.into_iter().collect())
}

pub(crate) fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}
