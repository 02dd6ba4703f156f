//! CSV bar loading.
//!
//! Accepts the common export layouts: capitalised (`Open`, `High`, ...) or
//! lowercase column names, and a timestamp column named `timestamp`,
//! `Gmt time`, `datetime`, `date` or `time`. Rows whose volume is zero are
//! dropped by default; markets that are closed still print flat zero-volume
//! bars in many feeds.
//!
//! The loader does not reject malformed bars. It logs the first defect and
//! leaves the abort to the replay, which reports the exact bar index.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zonebreak_core::domain::{Bar, BarSeries};
use zonebreak_core::fingerprint::{dataset_hash, Digest};

use crate::synthetic::{self, SyntheticSpec};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("no timestamp column (expected one of: timestamp, gmt time, datetime, date, time)")]
    NoTimestampColumn,

    #[error("row {row}: unrecognised timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' is not a number: '{value}'")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("no bars left after loading {0}")]
    Empty(String),
}

/// Options controlling how rows become bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub drop_zero_volume: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            drop_zero_volume: true,
        }
    }
}

/// Provenance of a loaded series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { seed: u64 },
    InMemory,
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic { .. })
    }
}

/// A loaded series with provenance and load statistics.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: BarSeries,
    pub source: DataSource,
    pub dataset_hash: Digest,
    pub rows_read: usize,
    pub rows_dropped: usize,
    /// Bars kept but with open/close outside the high-low range or a
    /// non-positive price.
    pub rows_suspect: usize,
}

impl LoadedData {
    fn new(series: BarSeries, source: DataSource, rows_read: usize, rows_dropped: usize) -> Self {
        if let Some((index, defect)) = series.first_defect() {
            warn!(index, %defect, "loaded series contains a malformed bar");
        }
        let rows_suspect = series.iter().filter(|b| !b.is_void() && !b.is_sane()).count();
        if rows_suspect > 0 {
            warn!(rows_suspect, "bars with inconsistent OHLC kept as-is");
        }
        Self {
            dataset_hash: dataset_hash(&series),
            series,
            source,
            rows_read,
            rows_dropped,
            rows_suspect,
        }
    }

    pub fn from_series(series: BarSeries) -> Self {
        let n = series.len();
        Self::new(series, DataSource::InMemory, n, 0)
    }
}

/// Timestamp formats tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp in any of the supported formats. Date-only values
/// land on midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "gmt time", "datetime", "date", "time"];

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| n == name)
                .ok_or(LoadError::MissingColumn(name))
        };
        let timestamp = TIMESTAMP_ALIASES
            .iter()
            .find_map(|alias| names.iter().position(|n| n == alias))
            .ok_or(LoadError::NoTimestampColumn)?;
        Ok(Self {
            timestamp,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

fn number(
    record: &csv::StringRecord,
    col: usize,
    name: &'static str,
    row: usize,
) -> Result<f64, LoadError> {
    let raw = record.get(col).unwrap_or("").trim();
    // Empty cells become NaN so that the replay flags the bar.
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| LoadError::BadNumber {
        row,
        column: name,
        value: raw.to_string(),
    })
}

/// Parse CSV rows into a series. Returns `(series, rows_read, rows_dropped)`.
pub fn read_bars<R: Read>(
    reader: R,
    opts: &LoadOptions,
) -> Result<(BarSeries, usize, usize), LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let cols = Columns::resolve(rdr.headers()?)?;

    let mut series = BarSeries::default();
    let mut rows_read = 0;
    let mut rows_dropped = 0;

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // 1-based data row, header excluded.
        let row = i + 1;
        rows_read += 1;

        let raw_ts = record.get(cols.timestamp).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;
        let volume = number(&record, cols.volume, "volume", row)?;
        if opts.drop_zero_volume && volume == 0.0 {
            rows_dropped += 1;
            continue;
        }

        series.push(Bar::new(
            timestamp,
            number(&record, cols.open, "open", row)?,
            number(&record, cols.high, "high", row)?,
            number(&record, cols.low, "low", row)?,
            number(&record, cols.close, "close", row)?,
            volume,
        ));
    }

    debug!(rows_read, rows_dropped, "parsed CSV rows");
    Ok((series, rows_read, rows_dropped))
}

/// Load bars from a CSV file.
pub fn load_csv(path: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (series, rows_read, rows_dropped) = read_bars(file, opts)?;
    if series.is_empty() {
        return Err(LoadError::Empty(path.display().to_string()));
    }
    info!(
        path = %path.display(),
        bars = series.len(),
        dropped = rows_dropped,
        "loaded bars"
    );
    Ok(LoadedData::new(
        series,
        DataSource::Csv {
            path: path.to_path_buf(),
        },
        rows_read,
        rows_dropped,
    ))
}

/// Generate a synthetic series. Results on it are tagged as synthetic.
pub fn load_synthetic(spec: &SyntheticSpec) -> Result<LoadedData, LoadError> {
    let series = synthetic::generate(spec);
    if series.is_empty() {
        return Err(LoadError::Empty(format!("synthetic seed {}", spec.seed)));
    }
    warn!(
        seed = spec.seed,
        bars = series.len(),
        "using synthetic data; results are tagged as synthetic"
    );
    let n = series.len();
    Ok(LoadedData::new(
        series,
        DataSource::Synthetic { seed: spec.seed },
        n,
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUKASCOPY: &str = "\
Gmt time,Open,High,Low,Close,Volume
01.01.2024 00:00:00.000,1.1000,1.1010,1.0990,1.1005,120.5
01.01.2024 01:00:00.000,1.1005,1.1005,1.1005,1.1005,0
01.01.2024 02:00:00.000,1.1005,1.1020,1.1000,1.1015,98.0
";

    #[test]
    fn parses_all_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        for raw in [
            "05.03.2024 14:30:00.000",
            "2024-03-05 14:30:00",
            "2024-03-05T14:30:00",
            "2024-03-05 14:30",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "format: {raw}");
        }
        assert_eq!(
            parse_timestamp("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn zero_volume_rows_dropped() {
        let (series, read, dropped) = read_bars(DUKASCOPY.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(read, 3);
        assert_eq!(dropped, 1);
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(1).unwrap().index, 1);
        assert_eq!(series.get(1).unwrap().close, 1.1015);
    }

    #[test]
    fn zero_volume_kept_when_disabled() {
        let opts = LoadOptions {
            drop_zero_volume: false,
        };
        let (series, _, dropped) = read_bars(DUKASCOPY.as_bytes(), &opts).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn lowercase_columns_accepted() {
        let csv = "timestamp,open,high,low,close,volume\n2024-01-02,10,11,9,10.5,100\n";
        let (series, _, _) = read_bars(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(0).unwrap().high, 11.0);
    }

    #[test]
    fn missing_column_reported() {
        let csv = "date,open,high,low,volume\n2024-01-02,10,11,9,100\n";
        let err = read_bars(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("close")));
    }

    #[test]
    fn missing_timestamp_reported() {
        let csv = "open,high,low,close,volume\n10,11,9,10,100\n";
        let err = read_bars(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::NoTimestampColumn));
    }

    #[test]
    fn bad_number_reports_row() {
        let csv = "date,open,high,low,close,volume\n2024-01-02,10,11,9,10,100\n2024-01-03,x,11,9,10,100\n";
        let err = read_bars(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::BadNumber { row: 2, column: "open", .. }));
    }

    #[test]
    fn empty_price_cell_becomes_nan() {
        let csv = "date,open,high,low,close,volume\n2024-01-02,10,11,9,,100\n";
        let (series, _, _) = read_bars(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert!(series.get(0).unwrap().close.is_nan());
    }
}
