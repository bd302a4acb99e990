//! Latest-row inference.

use std::collections::BTreeMap;

use crate::domain::batch::{BatchReport, SkippedSymbol};
use crate::domain::error::PipelineError;
use crate::domain::features::FeatureRow;
use crate::domain::model::Model;

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub buy: bool,
    pub probability: f64,
    pub as_of: chrono::NaiveDate,
}

/// Row with the greatest date, regardless of table order.
pub fn latest_row(rows: &[FeatureRow]) -> Option<&FeatureRow> {
    rows.iter().max_by_key(|r| r.date)
}

/// Scores the most recent feature row of one symbol.
pub fn infer_signal(symbol: &str, rows: &[FeatureRow], model: &Model) -> Result<Signal, PipelineError> {
    let row = latest_row(rows).ok_or_else(|| PipelineError::NoData {
        symbol: symbol.to_string(),
    })?;
    if !row.is_finite() {
        return Err(PipelineError::data_shape(
            symbol,
            format!("non-finite feature value on {}", row.date),
        ));
    }

    let probability = model.predict_proba(row);
    Ok(Signal {
        symbol: symbol.to_string(),
        buy: probability > 0.5,
        probability,
        as_of: row.date,
    })
}

#[derive(Debug, Default)]
pub struct InferenceReport {
    /// Buy-signaled symbols, sorted.
    pub buy: Vec<String>,
    pub hold: Vec<String>,
    /// Positive-class probability of every scored symbol.
    pub probabilities: BTreeMap<String, f64>,
    pub skipped: Vec<SkippedSymbol>,
}

impl InferenceReport {
    pub fn from_batch(batch: BatchReport<Signal>) -> Self {
        let probabilities = batch
            .completed
            .iter()
            .map(|(_, s)| (s.symbol.clone(), s.probability))
            .collect();
        let (buy, hold): (Vec<Signal>, Vec<Signal>) =
            batch.completed.into_iter().map(|(_, s)| s).partition(|s| s.buy);

        let mut buy: Vec<String> = buy.into_iter().map(|s| s.symbol).collect();
        buy.sort();
        Self {
            buy,
            hold: hold.into_iter().map(|s| s.symbol).collect(),
            probabilities,
            skipped: batch.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::label::LabeledRow;
    use crate::domain::model::ForestConfig;
    use chrono::NaiveDate;

    fn row(day: i64, rsi: f64) -> FeatureRow {
        FeatureRow {
            timestamp: day,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: rsi * 2.0,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + chrono::Duration::days(day),
            sma20: rsi / 50.0,
            ema50: 1.0,
            rsi14: rsi,
            macd: rsi / 10.0,
            atr14: rsi / 100.0,
            obv: rsi * 3.0,
        }
    }

    // Buys when rsi is high.
    fn model() -> Model {
        let rows: Vec<LabeledRow> = (0..20)
            .map(|d| {
                let label = u8::from(d % 2 == 0);
                LabeledRow {
                    features: row(d, if label == 1 { 80.0 } else { 20.0 }),
                    future_return: 0.0,
                    label,
                }
            })
            .collect();
        let config = ForestConfig {
            n_estimators: 9,
            ..ForestConfig::default()
        };
        Model::train("XYZ", &rows, &config).unwrap()
    }

    #[test]
    fn uses_latest_row_even_when_unsorted() {
        let rows = vec![row(5, 80.0), row(9, 20.0), row(1, 80.0)];
        assert_eq!(latest_row(&rows).unwrap().date, rows[1].date);

        let signal = infer_signal("XYZ", &rows, &model()).unwrap();
        assert!(!signal.buy);
        assert_eq!(signal.as_of, rows[1].date);
    }

    #[test]
    fn buy_signal_on_high_rsi() {
        let signal = infer_signal("XYZ", &[row(3, 80.0)], &model()).unwrap();
        assert!(signal.buy);
        assert!(signal.probability > 0.5);
    }

    #[test]
    fn empty_table_is_no_data() {
        let err = infer_signal("XYZ", &[], &model()).unwrap_err();
        assert!(matches!(err, PipelineError::NoData { .. }));
    }

    #[test]
    fn report_sorts_buy_list() {
        let signal = |s: &str, buy| Signal {
            symbol: s.to_string(),
            buy,
            probability: if buy { 0.9 } else { 0.1 },
            as_of: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let batch = BatchReport {
            completed: vec![
                ("SOL".to_string(), signal("SOL", true)),
                ("ADA".to_string(), signal("ADA", true)),
                ("ETH".to_string(), signal("ETH", false)),
            ],
            skipped: vec![SkippedSymbol::new("DOT", PipelineError::NoData { symbol: "DOT".into() })],
        };
        let report = InferenceReport::from_batch(batch);
        assert_eq!(report.buy, vec!["ADA", "SOL"]);
        assert_eq!(report.hold, vec!["ETH"]);
        assert_eq!(report.probabilities.get("ADA"), Some(&0.9));
        assert_eq!(report.probabilities.get("ETH"), Some(&0.1));
        assert!(!report.probabilities.contains_key("DOT"));
        assert_eq!(report.skipped.len(), 1);
    }
}
