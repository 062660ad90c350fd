//! Bar loading from CSV.
//!
//! Expected header:
//! `timestamp,open,high,low,close,volume,taker_buy_volume,num_trades`
//! with RFC 3339 timestamps in strictly increasing order. Every bar must pass
//! `Bar::is_sane`. Missing intervals are reported as gaps and left as they
//! are; nothing is interpolated.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use edgelab_core::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: bar at {timestamp} fails OHLCV sanity checks")]
    InvalidBar { line: usize, timestamp: DateTime<Utc> },

    #[error("line {line}: timestamp {timestamp} is not after previous bar {previous}")]
    NonMonotonic {
        line: usize,
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    #[error("no bars in input")]
    Empty,
}

/// A run of missing bars between two consecutive loaded bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub after: DateTime<Utc>,
    pub before: DateTime<Utc>,
    pub missing: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    pub gaps: Vec<Gap>,
}

impl LoadedBars {
    pub fn missing_bars(&self) -> usize {
        self.gaps.iter().map(|g| g.missing).sum()
    }
}

/// Load and validate bars from a CSV file.
pub fn load_bars_csv(path: &Path, bar_interval_minutes: f64) -> Result<LoadedBars, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_bars(file, bar_interval_minutes)?;
    info!(
        path = %path.display(),
        bars = loaded.bars.len(),
        gaps = loaded.gaps.len(),
        missing = loaded.missing_bars(),
        "bars loaded"
    );
    Ok(loaded)
}

/// Parse and validate bars from any CSV source.
pub fn read_bars<R: Read>(reader: R, bar_interval_minutes: f64) -> Result<LoadedBars, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars: Vec<Bar> = Vec::new();

    for (i, record) in rdr.deserialize::<Bar>().enumerate() {
        let bar = record?;
        // header is line 1
        let line = i + 2;
        if !bar.is_sane() {
            return Err(LoadError::InvalidBar {
                line,
                timestamp: bar.timestamp,
            });
        }
        if let Some(prev) = bars.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(LoadError::NonMonotonic {
                    line,
                    previous: prev.timestamp,
                    timestamp: bar.timestamp,
                });
            }
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }

    let gaps = find_gaps(&bars, bar_interval_minutes);
    for g in &gaps {
        warn!(after = %g.after, before = %g.before, missing = g.missing, "gap in bar series");
    }
    Ok(LoadedBars { bars, gaps })
}

/// Gaps where consecutive bars are more than one interval apart.
pub fn find_gaps(bars: &[Bar], bar_interval_minutes: f64) -> Vec<Gap> {
    let interval_secs = (bar_interval_minutes * 60.0).round() as i64;
    if interval_secs <= 0 {
        return Vec::new();
    }
    bars.windows(2)
        .filter_map(|w| {
            let elapsed = (w[1].timestamp - w[0].timestamp).num_seconds();
            let steps = elapsed / interval_secs;
            (steps > 1).then(|| Gap {
                after: w[0].timestamp,
                before: w[1].timestamp,
                missing: (steps - 1) as usize,
            })
        })
        .collect()
}
