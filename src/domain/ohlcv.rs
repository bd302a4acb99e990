//! Daily OHLCV bar representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily candle for one symbol. `timestamp` is the candle open time in epoch
/// milliseconds; `date` is its calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(with = "crate::domain::date_format")]
    pub date: NaiveDate,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Calendar date for an epoch-millisecond candle open time (UTC).
pub fn date_from_millis(timestamp: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp_millis(timestamp).map(|dt| dt.date_naive())
}

/// Returns the bars sorted ascending by date. The caller's slice is left untouched.
pub fn sorted_by_date(bars: &[Bar]) -> Vec<Bar> {
    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|b| b.date);
    sorted
}
