//! OBV (On-Balance Volume).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

/// Calculate OBV (On-Balance Volume).
///
/// OBV[0] = volume[0]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// Otherwise (up or flat day): OBV[i] = OBV[i-1] + volume[i]
///
/// The accumulator only resets at the start of the slice. No warmup.
pub fn calculate_obv(bars: &[Bar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    let mut prev_close: Option<f64> = None;

    for bar in bars {
        match prev_close {
            Some(prev) if bar.close < prev => obv -= bar.volume,
            _ => obv += bar.volume,
        }
        prev_close = Some(bar.close);

        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(obv),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}
