//! Run fingerprinting: BLAKE3 digests that pin down a run's inputs and
//! outputs, so determinism can be checked across runs and machines.
//!
//! - `params_hash`: canonical JSON of the [`StrategyParams`]
//! - `dataset_hash`: raw little-endian bytes of every bar
//! - `ledger_hash`: raw little-endian bytes of every trade

use crate::domain::{Bar, BarSeries, Trade};
use crate::params::StrategyParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex-encoded BLAKE3 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(pub String);

impl Digest {
    fn of(hasher: &blake3::Hasher) -> Self {
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digest of the parameters. Field order is fixed by the struct definition,
/// so the JSON form is canonical.
pub fn params_hash(params: &StrategyParams) -> Result<Digest, serde_json::Error> {
    let json = serde_json::to_vec(params)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(&json);
    Ok(Digest::of(&hasher))
}

fn hash_bar(hasher: &mut blake3::Hasher, bar: &Bar) {
    hasher.update(&bar.timestamp.and_utc().timestamp_micros().to_le_bytes());
    for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
        hasher.update(&v.to_le_bytes());
    }
}

pub fn dataset_hash(series: &BarSeries) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for bar in series.iter() {
        hash_bar(&mut hasher, bar);
    }
    Digest::of(&hasher)
}

/// Digest of a ledger. Bit-identical ledgers, and only those, share a digest.
pub fn ledger_hash(trades: &[Trade]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for t in trades {
        hasher.update(&(t.entry_index as u64).to_le_bytes());
        hasher.update(&(t.exit_index as u64).to_le_bytes());
        hasher.update(t.side.sign().to_le_bytes().as_slice());
        hasher.update(t.exit_reason.as_str().as_bytes());
        for v in [t.entry_price, t.exit_price, t.size, t.pnl] {
            hasher.update(&v.to_le_bytes());
        }
    }
    Digest::of(&hasher)
}

/// Complete fingerprint of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub params_hash: Digest,
    pub dataset_hash: Digest,
    pub ledger_hash: Digest,
}

impl RunFingerprint {
    pub fn new(
        params: &StrategyParams,
        series: &BarSeries,
        trades: &[Trade],
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            params_hash: params_hash(params)?,
            dataset_hash: dataset_hash(series),
            ledger_hash: ledger_hash(trades),
        })
    }
}
