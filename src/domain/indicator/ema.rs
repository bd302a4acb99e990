//! Exponential Moving Average.
//!
//! k = 2/(n+1), EMA[0] = C[0], then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! The recursion runs from the first bar; the first (n-1) values are only
//! hidden as warmup, not dropped from the recursion.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_ema(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let raw = ema_of(&closes, period);

    let values = bars
        .iter()
        .zip(raw)
        .map(|(bar, ema)| IndicatorPoint {
            date: bar.date,
            valid: ema.is_some(),
            value: IndicatorValue::Simple(ema.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// EMA over a plain value slice, started from the first value; `None` during warmup.
pub(crate) fn ema_of(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            ema = if i == 0 { value } else { value * k + ema * (1.0 - k) };
            (i + 1 >= period).then_some(ema)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: i as i64 * 86_400_000,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
            })
            .collect()
    }

    fn simple(series: &IndicatorSeries, i: usize) -> f64 {
        series.values[i].value.scalar()
    }

    #[test]
    fn ema_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn ema_starts_from_first_close() {
        // pandas ewm(span=3, adjust=False): 10, 15, 22.5
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 3);
        assert_eq!(series.value_at(1), None);
        assert!((simple(&series, 2) - 22.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        // k = 0.5: 22.5 -> 31.25 -> 40.625
        assert!((simple(&series, 3) - 31.25).abs() < f64::EPSILON);
        assert!((simple(&series, 4) - 40.625).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let bars = make_bars(&[100.0; 5]);
        let series = calculate_ema(&bars, 3);
        for i in 2..5 {
            assert!((simple(&series, i) - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_period_longer_than_input() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_ema(&bars, 50);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn ema_period_0() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_ema(&bars, 0);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn ema_of_plain_values() {
        let out = ema_of(&[1.0, 2.0, 3.0], 2);
        assert_eq!(out[0], None);
        // 2 * 2/3 + 1 * 1/3
        assert!((out[1].unwrap() - 5.0 / 3.0).abs() < 1e-12);
        // 3 * 2/3 + 5/3 * 1/3
        assert!((out[2].unwrap() - 23.0 / 9.0).abs() < 1e-12);
    }
}
