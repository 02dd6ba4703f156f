//! Result export: trade ledger CSV, equity CSV, sweep CSV and result JSON.
//!
//! Persisted JSON carries a `schema_version`; newer versions are rejected
//! on import.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use zonebreak_core::domain::Trade;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unsupported schema version {found} (max supported: {max})")]
    UnsupportedSchema { found: u32, max: u32 },
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn import_json(json: &str) -> Result<BacktestResult, ExportError> {
    let result: BacktestResult = serde_json::from_str(json)?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: result.schema_version,
            max: SCHEMA_VERSION,
        });
    }
    Ok(result)
}

// ─── CSV ────────────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn ts(t: Option<chrono::NaiveDateTime>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Trade ledger, one row per trade in close order.
///
/// Columns: side, entry_index, entry_time, entry_price, exit_index,
/// exit_time, exit_price, exit_reason, size, pnl, return_pct, bars_held,
/// mae, mfe
pub fn export_trades_csv(trades: &[Trade]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "exit_reason",
        "size",
        "pnl",
        "return_pct",
        "bars_held",
        "mae",
        "mfe",
    ])?;
    for t in trades {
        wtr.write_record([
            format!("{:?}", t.side),
            t.entry_index.to_string(),
            ts(t.entry_timestamp),
            format!("{:.6}", t.entry_price),
            t.exit_index.to_string(),
            ts(Some(t.exit_timestamp)),
            format!("{:.6}", t.exit_price),
            t.exit_reason.as_str().to_string(),
            format!("{:.6}", t.size),
            format!("{:.6}", t.pnl),
            format!("{:.6}", t.return_pct()),
            t.bars_held.to_string(),
            format!("{:.6}", t.mae),
            format!("{:.6}", t.mfe),
        ])?;
    }
    finish(wtr)
}

/// Mark-to-market equity, one row per bar.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([i.to_string(), format!("{eq:.6}")])?;
    }
    finish(wtr)
}

/// Sweep table in rank order.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "index",
        "pivot_window",
        "zone_tolerance",
        "stop_multiple",
        "target_multiple",
        "trades",
        "total_pnl",
        "win_rate",
        "profit_factor",
        "max_drawdown",
        "ledger_hash",
    ])?;
    for (rank, p) in results.ranked().into_iter().enumerate() {
        wtr.write_record([
            (rank + 1).to_string(),
            p.index.to_string(),
            p.params.pivot_window.to_string(),
            p.params.zone_tolerance.to_string(),
            p.params.stop_multiple.to_string(),
            p.params.target_multiple.to_string(),
            p.summary.trade_count.to_string(),
            format!("{:.6}", p.summary.total_pnl),
            format!("{:.4}", p.summary.win_rate),
            format!("{:.4}", p.metrics.profit_factor),
            format!("{:.4}", p.metrics.max_drawdown),
            p.ledger_hash.to_string(),
        ])?;
    }
    finish(wtr)
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Paths written by [`save_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub result_json: PathBuf,
    pub trades_csv: PathBuf,
    pub equity_csv: PathBuf,
}

fn write(path: PathBuf, contents: &str) -> Result<PathBuf, ExportError> {
    std::fs::write(&path, contents).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write `result.json`, `trades.csv` and `equity.csv` into `dir`.
pub fn save_artifacts(result: &BacktestResult, dir: &Path) -> Result<ArtifactPaths, ExportError> {
    ensure_dir(dir)?;
    let paths = ArtifactPaths {
        result_json: write(dir.join("result.json"), &export_json(result)?)?,
        trades_csv: write(dir.join("trades.csv"), &export_trades_csv(&result.trades)?)?,
        equity_csv: write(dir.join("equity.csv"), &export_equity_csv(&result.equity_curve)?)?,
    };
    info!(dir = %dir.display(), trades = result.trades.len(), "artifacts written");
    Ok(paths)
}

/// Write `sweep.csv` and `sweep.json` into `dir`; returns the CSV path.
pub fn save_sweep(results: &SweepResults, dir: &Path) -> Result<PathBuf, ExportError> {
    ensure_dir(dir)?;
    write(dir.join("sweep.json"), &serde_json::to_string_pretty(results)?)?;
    write(dir.join("sweep.csv"), &export_sweep_csv(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use zonebreak_core::domain::{ExitReason, PositionSide};

    fn sample_trade() -> Trade {
        let ts = |h| {
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        Trade {
            entry_index: 20,
            entry_timestamp: Some(ts(1)),
            entry_price: 5.8,
            exit_index: 21,
            exit_timestamp: ts(2),
            exit_price: 6.0,
            exit_reason: ExitReason::RsiExit,
            side: PositionSide::Long,
            size: 1000.0,
            pnl: 200.0,
            bars_held: 1,
            mae: -10.0,
            mfe: 250.0,
        }
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let csv = export_trades_csv(&[sample_trade()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("side,entry_index,entry_time"));
        assert!(lines[1].starts_with("Long,20,2024-01-02 01:00:00,5.800000"));
        assert!(lines[1].contains(",RSIExit,"));
        // 200 on 5.8 * 1000 notional
        assert!(lines[1].contains(",200.000000,0.034483,1,"));
    }

    #[test]
    fn empty_ledger_is_header_only() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn equity_csv_one_row_per_bar() {
        let csv = export_equity_csv(&[10_000.0, 10_050.5]).unwrap();
        assert_eq!(csv, "bar,equity\n0,10000.000000\n1,10050.500000\n");
    }
}
