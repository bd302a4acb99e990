//! Binary classification metrics for walk-forward folds.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 plus accuracy. Ratios with a zero
/// denominator are reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassificationReport {
    pub negative: ClassMetrics,
    pub positive: ClassMetrics,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn class_metrics(tp: usize, fp: usize, fn_: usize) -> ClassMetrics {
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

impl ClassificationReport {
    /// `actual` and `predicted` are paired by position; extra entries in the
    /// longer slice are ignored.
    pub fn compute(actual: &[u8], predicted: &[u8]) -> Self {
        let mut c = Confusion::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a == 1, p == 1) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }

        Self {
            positive: class_metrics(c.tp, c.fp, c.fn_),
            negative: class_metrics(c.tn, c.fn_, c.fp),
            accuracy: ratio(c.tp + c.tn, c.tp + c.tn + c.fp + c.fn_),
        }
    }

    pub fn support(&self) -> usize {
        self.negative.support + self.positive.support
    }

    pub fn macro_f1(&self) -> f64 {
        (self.negative.f1 + self.positive.f1) / 2.0
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1", "support")?;
        for (name, m) in [("0", &self.negative), ("1", &self.positive)] {
            writeln!(
                f,
                "{:>10} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        write!(f, "{:>10} {:>29.2} {:>9}", "accuracy", self.accuracy, self.support())
    }
}
