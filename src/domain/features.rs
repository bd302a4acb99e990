//! Feature engine: daily bars → feature rows.
//!
//! Input is sorted by date on a private copy. A row is emitted only once every
//! indicator's trailing window is populated, so the output is shorter than the
//! input by `LARGEST_WINDOW - 1` rows (EMA(50) dominates).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;
use crate::domain::indicator::{
    calculate_atr, calculate_ema, calculate_macd_default, calculate_obv, calculate_rsi,
    calculate_sma, IndicatorSeries,
};
use crate::domain::ohlcv::{sorted_by_date, Bar};

pub const SMA_PERIOD: usize = 20;
pub const EMA_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;

/// Longest trailing window any indicator needs before it is defined.
pub const LARGEST_WINDOW: usize = EMA_PERIOD;

pub const N_FEATURES: usize = 11;

/// Model input columns, in the order the classifier consumes them.
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "open", "high", "low", "close", "volume", "sma20", "ema50", "rsi14", "macd", "atr14", "obv",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(with = "crate::domain::date_format")]
    pub date: NaiveDate,
    pub sma20: f64,
    pub ema50: f64,
    pub rsi14: f64,
    pub macd: f64,
    pub atr14: f64,
    pub obv: f64,
}

impl FeatureRow {
    /// Values in [`FEATURE_COLUMNS`] order.
    pub fn feature_vector(&self) -> [f64; N_FEATURES] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.sma20,
            self.ema50,
            self.rsi14,
            self.macd,
            self.atr14,
            self.obv,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.feature_vector().iter().all(|v| v.is_finite())
    }
}

/// Computes the feature table for one symbol.
///
/// Empty input, non-finite prices or duplicate dates are a data-shape error.
/// Input too short for the indicator windows yields an empty table.
pub fn generate_features(symbol: &str, bars: &[Bar]) -> Result<Vec<FeatureRow>, PipelineError> {
    if bars.is_empty() {
        return Err(PipelineError::data_shape(symbol, "no bars to compute features from"));
    }
    if let Some(bad) = bars.iter().find(|b| !b.is_finite()) {
        return Err(PipelineError::data_shape(
            symbol,
            format!("non-finite price or volume on {}", bad.date),
        ));
    }

    let bars = sorted_by_date(bars);
    if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(PipelineError::data_shape(
            symbol,
            format!("duplicate bar date {}", pair[0].date),
        ));
    }

    let sma = calculate_sma(&bars, SMA_PERIOD);
    let ema = calculate_ema(&bars, EMA_PERIOD);
    let rsi = calculate_rsi(&bars, RSI_PERIOD);
    let macd = calculate_macd_default(&bars);
    let atr = calculate_atr(&bars, ATR_PERIOD);
    let obv = calculate_obv(&bars);

    let mut warmup = 0;
    for series in [&sma, &ema, &rsi, &macd, &atr, &obv] {
        match series.first_valid() {
            Some(start) => warmup = warmup.max(start),
            None => {
                tracing::debug!(
                    symbol,
                    indicator = %series.indicator_type,
                    bars = bars.len(),
                    "indicator never warms up"
                );
                return Ok(Vec::new());
            }
        }
    }

    let rows = bars
        .iter()
        .enumerate()
        .skip(warmup)
        .filter_map(|(i, bar)| {
            let at = |s: &IndicatorSeries| s.value_at(i);
            Some(FeatureRow {
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                date: bar.date,
                sma20: at(&sma)?,
                ema50: at(&ema)?,
                rsi14: at(&rsi)?,
                macd: at(&macd)?,
                atr14: at(&atr)?,
                obv: at(&obv)?,
            })
        })
        .filter(FeatureRow::is_finite)
        .collect();

    Ok(rows)
}
