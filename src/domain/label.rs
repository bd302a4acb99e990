//! Forward-return labeling.
//!
//! `future_return[i] = close[i + H] / close[i] - 1` and the label is 1 when
//! that return strictly exceeds the threshold. The last `H` rows have no
//! forward window and are dropped.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::features::FeatureRow;

/// Days ahead the forward return looks.
pub const HORIZON: usize = 7;
/// Minimum forward return for a positive label.
pub const THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPolicy {
    pub horizon: usize,
    pub threshold: f64,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            horizon: HORIZON,
            threshold: THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub features: FeatureRow,
    pub future_return: f64,
    pub label: u8,
}

impl LabeledRow {
    pub fn date(&self) -> NaiveDate {
        self.features.date
    }
}

/// Labels a feature table. Rows are re-sorted by date on a copy first.
///
/// Rows whose forward return is not finite (zero close) are dropped.
pub fn generate_labels(rows: &[FeatureRow], policy: &LabelPolicy) -> Vec<LabeledRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.date);

    if policy.horizon == 0 || sorted.len() <= policy.horizon {
        return Vec::new();
    }

    sorted
        .iter()
        .zip(&sorted[policy.horizon..])
        .filter_map(|(now, ahead)| {
            let future_return = ahead.close / now.close - 1.0;
            if !future_return.is_finite() {
                return None;
            }
            Some(LabeledRow {
                features: now.clone(),
                future_return,
                label: u8::from(future_return > policy.threshold),
            })
        })
        .collect()
}

/// Inner join of a feature table with a label table on date.
///
/// Feature columns come from `features`; only the forward return and label
/// are taken from `labels`. Output is ordered by date.
pub fn join_by_date(features: &[FeatureRow], labels: &[LabeledRow]) -> Vec<LabeledRow> {
    let by_date: HashMap<NaiveDate, &LabeledRow> = labels.iter().map(|l| (l.date(), l)).collect();

    let mut joined: Vec<LabeledRow> = features
        .iter()
        .filter_map(|row| {
            by_date.get(&row.date).map(|l| LabeledRow {
                features: row.clone(),
                future_return: l.future_return,
                label: l.label,
            })
        })
        .collect();
    joined.sort_by_key(LabeledRow::date);
    joined
}
