//! Per-symbol batch execution.
//!
//! A stage maps a task over symbols. Symbol-level failures become
//! [`SkippedSymbol`] entries and the batch carries on; the first fatal error
//! (by input order) is returned once every symbol has been attempted.

use rayon::prelude::*;

use crate::domain::error::PipelineError;

#[derive(Debug)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub error: PipelineError,
}

impl SkippedSymbol {
    pub fn new(symbol: &str, error: PipelineError) -> Self {
        Self {
            symbol: symbol.to_string(),
            error,
        }
    }
}

#[derive(Debug)]
pub struct BatchReport<T> {
    /// Successful symbols with their results, in input order.
    pub completed: Vec<(String, T)>,
    /// Skipped symbols with reasons, in input order.
    pub skipped: Vec<SkippedSymbol>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.completed.iter().map(|(s, _)| s.as_str())
    }

    pub fn attempted(&self) -> usize {
        self.completed.len() + self.skipped.len()
    }

    fn from_outcomes(outcomes: Vec<(String, Result<T, PipelineError>)>) -> Result<Self, PipelineError> {
        let mut report = Self::default();
        let mut fatal = None;

        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(value) => report.completed.push((symbol, value)),
                Err(e) if e.is_symbol_level() => {
                    tracing::warn!(symbol = %symbol, error = %e, "skipping symbol");
                    report.skipped.push(SkippedSymbol { symbol, error: e });
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, error = %e, "fatal error");
                    fatal.get_or_insert(e);
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Fixed-size rayon pool for CPU-bound per-symbol stages.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// `workers == 0` sizes the pool to the number of cores.
    pub fn new(workers: usize) -> Result<Self, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("coinsignal-worker-{i}"))
            .build()
            .map_err(|e| PipelineError::ConfigInvalid {
                section: "pipeline".to_string(),
                key: "workers".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `task` for every symbol in parallel. Results keep input order.
    pub fn run<T, F>(&self, symbols: &[String], task: F) -> Result<BatchReport<T>, PipelineError>
    where
        T: Send,
        F: Fn(&str) -> Result<T, PipelineError> + Sync,
    {
        let outcomes = self.pool.install(|| {
            symbols
                .par_iter()
                .map(|symbol| (symbol.clone(), task(symbol)))
                .collect::<Vec<_>>()
        });
        BatchReport::from_outcomes(outcomes)
    }
}

/// Runs `task` for every symbol on the calling thread, for stages that must
/// serialize their calls (rate-limited market access).
pub fn run_sequential<T, F>(symbols: &[String], mut task: F) -> Result<BatchReport<T>, PipelineError>
where
    F: FnMut(&str) -> Result<T, PipelineError>,
{
    let outcomes = symbols
        .iter()
        .map(|symbol| (symbol.clone(), task(symbol)))
        .collect();
    BatchReport::from_outcomes(outcomes)
}
