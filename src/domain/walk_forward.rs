//! Expanding-window walk-forward validation.
//!
//! The ordered rows are cut into `K + 1` contiguous blocks of `n / (K + 1)`
//! rows (any remainder widens the first training block). Fold `k` trains on
//! everything before test block `k` and scores on that block alone. A final
//! model is then fit on every row and is the only one kept.

use std::ops::Range;

use chrono::NaiveDate;

use crate::domain::error::PipelineError;
use crate::domain::label::LabeledRow;
use crate::domain::metrics::ClassificationReport;
use crate::domain::model::{Dataset, ForestConfig, Model, RandomForest};

pub const N_SPLITS: usize = 5;

/// Fewest rows that still give every fold a non-empty test block.
pub const MIN_ROWS: usize = N_SPLITS + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Index ranges for `n_splits` expanding folds over `n_rows` ordered rows.
///
/// Returns `None` when there are fewer than `n_splits + 1` rows.
pub fn time_series_splits(n_rows: usize, n_splits: usize) -> Option<Vec<FoldSplit>> {
    if n_splits == 0 || n_rows < n_splits + 1 {
        return None;
    }
    let test_size = n_rows / (n_splits + 1);
    let first_test = n_rows - n_splits * test_size;

    Some(
        (0..n_splits)
            .map(|k| {
                let start = first_test + k * test_size;
                FoldSplit {
                    train: 0..start,
                    test: start..start + test_size,
                }
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldReport {
    pub fold: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    pub report: ClassificationReport,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub folds: Vec<FoldReport>,
    pub model: Model,
}

/// Runs walk-forward validation for one symbol and fits the final model.
///
/// `rows` must already be the date-joined labeled table; it is re-sorted on
/// a copy and rejected if dates repeat or features are not finite.
pub fn train_walk_forward(
    symbol: &str,
    rows: &[LabeledRow],
    config: &ForestConfig,
) -> Result<TrainingOutcome, PipelineError> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(LabeledRow::date);

    if let Some(pair) = rows.windows(2).find(|w| w[0].date() == w[1].date()) {
        return Err(PipelineError::data_shape(
            symbol,
            format!("duplicate labeled date {}", pair[0].date()),
        ));
    }
    if let Some(bad) = rows.iter().find(|r| !r.features.is_finite()) {
        return Err(PipelineError::data_shape(
            symbol,
            format!("non-finite feature value on {}", bad.date()),
        ));
    }

    let splits = time_series_splits(rows.len(), N_SPLITS).ok_or_else(|| {
        PipelineError::InsufficientHistory {
            symbol: symbol.to_string(),
            rows: rows.len(),
            minimum: MIN_ROWS,
        }
    })?;

    let data = Dataset::from_labeled(&rows);
    let folds = splits
        .iter()
        .enumerate()
        .map(|(k, split)| {
            let train = subset(&data, split.train.clone());
            let forest = RandomForest::fit(&train, config);
            let predicted = forest.predict_batch(&data.features[split.test.clone()]);
            let report = ClassificationReport::compute(&data.labels[split.test.clone()], &predicted);

            tracing::debug!(
                symbol,
                fold = k + 1,
                train_rows = split.train.len(),
                test_rows = split.test.len(),
                accuracy = report.accuracy,
                "fold scored"
            );

            FoldReport {
                fold: k + 1,
                train_rows: split.train.len(),
                test_rows: split.test.len(),
                train_start: rows[split.train.start].date(),
                train_end: rows[split.train.end - 1].date(),
                test_start: rows[split.test.start].date(),
                test_end: rows[split.test.end - 1].date(),
                report,
            }
        })
        .collect();

    let model = Model::train(symbol, &rows, config)?;
    Ok(TrainingOutcome { folds, model })
}

fn subset(data: &Dataset, range: Range<usize>) -> Dataset {
    Dataset {
        features: data.features[range.clone()].to_vec(),
        labels: data.labels[range].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FeatureRow;

    fn labeled(day: i64, label: u8) -> LabeledRow {
        let close = 100.0 + (day % 9) as f64;
        LabeledRow {
            features: FeatureRow {
                timestamp: day * 86_400_000,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 50.0 + day as f64,
                date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap() + chrono::Duration::days(day),
                sma20: close,
                ema50: close,
                rsi14: if label == 1 { 65.0 } else { 35.0 },
                macd: 0.1,
                atr14: 2.0,
                obv: day as f64,
            },
            future_return: 0.0,
            label,
        }
    }

    fn rows(n: i64) -> Vec<LabeledRow> {
        (0..n).map(|d| labeled(d, u8::from(d % 4 == 0))).collect()
    }

    fn config() -> ForestConfig {
        ForestConfig {
            n_estimators: 8,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn splits_match_expanding_blocks() {
        let splits = time_series_splits(12, 5).unwrap();
        assert_eq!(splits.len(), 5);
        assert_eq!(splits[0], FoldSplit { train: 0..2, test: 2..4 });
        assert_eq!(splits[4], FoldSplit { train: 0..10, test: 10..12 });
    }

    #[test]
    fn remainder_goes_to_first_training_block() {
        let splits = time_series_splits(14, 5).unwrap();
        assert_eq!(splits[0].train, 0..4);
        assert_eq!(splits[0].test, 4..6);
        assert_eq!(splits[4].test, 12..14);
    }

    #[test]
    fn minimum_rows_give_single_row_tests() {
        let splits = time_series_splits(6, 5).unwrap();
        assert!(splits.iter().all(|s| s.test.len() == 1));
        assert_eq!(splits[0].train, 0..1);
        assert!(time_series_splits(5, 5).is_none());
    }

    #[test]
    fn test_blocks_follow_training_blocks() {
        for n in 6..60 {
            for split in time_series_splits(n, N_SPLITS).unwrap() {
                assert_eq!(split.train.start, 0);
                assert_eq!(split.train.end, split.test.start);
                assert!(split.test.end <= n);
            }
        }
    }

    #[test]
    fn five_rows_is_insufficient() {
        let err = train_walk_forward("XYZ", &rows(5), &config()).unwrap_err();
        match err {
            PipelineError::InsufficientHistory { rows, minimum, .. } => {
                assert_eq!(rows, 5);
                assert_eq!(minimum, 6);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn fold_dates_never_leak() {
        let outcome = train_walk_forward("XYZ", &rows(60), &config()).unwrap();
        assert_eq!(outcome.folds.len(), N_SPLITS);
        for fold in &outcome.folds {
            assert!(fold.train_end < fold.test_start);
            assert!(fold.test_start <= fold.test_end);
            assert_eq!(fold.test_rows, 10);
        }
        for pair in outcome.folds.windows(2) {
            assert!(pair[0].train_rows < pair[1].train_rows);
        }
    }

    #[test]
    fn final_model_uses_all_rows() {
        let data = rows(40);
        let outcome = train_walk_forward("XYZ", &data, &config()).unwrap();
        assert_eq!(outcome.model.trained_rows, 40);
        assert_eq!(outcome.model.trained_through, data[39].date());
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let mut data = rows(30);
        data.reverse();
        let outcome = train_walk_forward("XYZ", &data, &config()).unwrap();
        assert!(outcome.folds[0].train_start < outcome.folds[0].test_start);
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let mut data = rows(20);
        data[5].features.date = data[4].features.date;
        assert!(matches!(
            train_walk_forward("XYZ", &data, &config()),
            Err(PipelineError::DataShape { .. })
        ));
    }

    #[test]
    fn training_is_deterministic() {
        let data = rows(50);
        let a = train_walk_forward("XYZ", &data, &config()).unwrap();
        let b = train_walk_forward("XYZ", &data, &config()).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.folds, b.folds);
    }
}
