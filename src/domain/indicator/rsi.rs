//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! Gains and losses start at 0 for the first bar, then follow
//! avg[i] = avg[i-1] + (x[i] - avg[i-1]) / n from the first bar on.
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)); 100 when avg_loss == 0.
//!
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut prev_close: Option<f64> = None;

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let change = prev_close.map_or(0.0, |prev| bar.close - prev);
            prev_close = Some(bar.close);
            avg_gain += (change.max(0.0) - avg_gain) * alpha;
            avg_loss += ((-change).max(0.0) - avg_loss) * alpha;

            let valid = i + 1 >= period;
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Simple(if valid { rsi_from(avg_gain, avg_loss) } else { 0.0 }),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
