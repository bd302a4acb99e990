//! Tabular artifact storage port.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::error::{Artifact, PipelineError};
use crate::domain::features::FeatureRow;
use crate::domain::label::LabeledRow;
use crate::domain::ohlcv::Bar;
use crate::domain::simulation::{EvaluatedPosition, SimulatedPosition};
use crate::domain::universe::RankedAsset;
use crate::domain::walk_forward::FoldReport;

/// Reads and writes per-symbol tables. Missing tables are reported as
/// `ArtifactNotFound`; writes replace any previous table.
pub trait DataPort: Send + Sync {
    /// Symbols that currently have a stored table of the given kind, sorted.
    fn list_symbols(&self, artifact: Artifact) -> Result<Vec<String>, PipelineError>;

    fn read_universe(&self) -> Result<Vec<RankedAsset>, PipelineError>;
    fn write_universe(&self, assets: &[RankedAsset]) -> Result<(), PipelineError>;

    fn read_bars(&self, symbol: &str) -> Result<Vec<Bar>, PipelineError>;
    fn write_bars(&self, symbol: &str, bars: &[Bar]) -> Result<(), PipelineError>;

    fn read_features(&self, symbol: &str) -> Result<Vec<FeatureRow>, PipelineError>;
    fn write_features(&self, symbol: &str, rows: &[FeatureRow]) -> Result<(), PipelineError>;

    fn read_labels(&self, symbol: &str) -> Result<Vec<LabeledRow>, PipelineError>;
    fn write_labels(&self, symbol: &str, rows: &[LabeledRow]) -> Result<(), PipelineError>;

    fn write_fold_reports(&self, symbol: &str, folds: &[FoldReport]) -> Result<(), PipelineError>;

    fn read_signals(&self) -> Result<Vec<String>, PipelineError>;
    fn write_signals(&self, symbols: &[String]) -> Result<PathBuf, PipelineError>;

    fn write_simulation(
        &self,
        date: NaiveDate,
        positions: &[SimulatedPosition],
    ) -> Result<PathBuf, PipelineError>;
    fn read_simulation(&self, path: &Path) -> Result<Vec<SimulatedPosition>, PipelineError>;
    fn write_evaluation(
        &self,
        source: &Path,
        rows: &[EvaluatedPosition],
    ) -> Result<PathBuf, PipelineError>;
}
