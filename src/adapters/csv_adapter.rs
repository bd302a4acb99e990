//! CSV file data adapter.
//!
//! Tables are written with a header row and read back by column name, so
//! extra columns in hand-edited files are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::adapters::layout::{ensure_parent, evaluation_path, storage_error, DataLayout};
use crate::domain::error::{Artifact, PipelineError};
use crate::domain::features::FeatureRow;
use crate::domain::label::LabeledRow;
use crate::domain::metrics::ClassificationReport;
use crate::domain::ohlcv::Bar;
use crate::domain::simulation::{EvaluatedPosition, SimulatedPosition};
use crate::domain::universe::RankedAsset;
use crate::domain::walk_forward::FoldReport;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    layout: DataLayout,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            layout: DataLayout::new(base_path),
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    fn table_path(&self, artifact: Artifact, symbol: &str) -> Result<PathBuf, PipelineError> {
        self.layout
            .symbol_path(artifact, symbol)
            .ok_or_else(|| PipelineError::not_found(symbol, artifact))
    }
}

fn read_table<T: DeserializeOwned>(
    path: &Path,
    symbol: &str,
    artifact: Artifact,
) -> Result<Vec<T>, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::not_found(symbol, artifact));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| storage_error(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| PipelineError::data_shape(symbol, format!("{}: {}", path.display(), e)))
}

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(|e| storage_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| storage_error(path, e))?;
    }
    writer.flush().map_err(|e| storage_error(path, e))
}

/// Flat label-table row: the feature columns followed by the label columns.
#[derive(Debug, Serialize, Deserialize)]
struct LabelRecord {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(with = "crate::domain::date_format")]
    date: NaiveDate,
    sma20: f64,
    ema50: f64,
    rsi14: f64,
    macd: f64,
    atr14: f64,
    obv: f64,
    future_return: f64,
    label: u8,
}

impl From<&LabeledRow> for LabelRecord {
    fn from(row: &LabeledRow) -> Self {
        let f = &row.features;
        Self {
            timestamp: f.timestamp,
            open: f.open,
            high: f.high,
            low: f.low,
            close: f.close,
            volume: f.volume,
            date: f.date,
            sma20: f.sma20,
            ema50: f.ema50,
            rsi14: f.rsi14,
            macd: f.macd,
            atr14: f.atr14,
            obv: f.obv,
            future_return: row.future_return,
            label: row.label,
        }
    }
}

impl From<LabelRecord> for LabeledRow {
    fn from(r: LabelRecord) -> Self {
        LabeledRow {
            features: FeatureRow {
                timestamp: r.timestamp,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
                date: r.date,
                sma20: r.sma20,
                ema50: r.ema50,
                rsi14: r.rsi14,
                macd: r.macd,
                atr14: r.atr14,
                obv: r.obv,
            },
            future_return: r.future_return,
            label: r.label,
        }
    }
}

#[derive(Debug, Serialize)]
struct FoldRecord {
    fold: usize,
    train_rows: usize,
    test_rows: usize,
    #[serde(with = "crate::domain::date_format")]
    train_start: NaiveDate,
    #[serde(with = "crate::domain::date_format")]
    train_end: NaiveDate,
    #[serde(with = "crate::domain::date_format")]
    test_start: NaiveDate,
    #[serde(with = "crate::domain::date_format")]
    test_end: NaiveDate,
    accuracy: f64,
    precision_0: f64,
    recall_0: f64,
    f1_0: f64,
    support_0: usize,
    precision_1: f64,
    recall_1: f64,
    f1_1: f64,
    support_1: usize,
}

impl From<&FoldReport> for FoldRecord {
    fn from(f: &FoldReport) -> Self {
        let ClassificationReport {
            negative: n,
            positive: p,
            accuracy,
        } = f.report;
        Self {
            fold: f.fold,
            train_rows: f.train_rows,
            test_rows: f.test_rows,
            train_start: f.train_start,
            train_end: f.train_end,
            test_start: f.test_start,
            test_end: f.test_end,
            accuracy,
            precision_0: n.precision,
            recall_0: n.recall,
            f1_0: n.f1,
            support_0: n.support,
            precision_1: p.precision,
            recall_1: p.recall,
            f1_1: p.f1,
            support_1: p.support,
        }
    }
}

impl DataPort for CsvAdapter {
    fn list_symbols(&self, artifact: Artifact) -> Result<Vec<String>, PipelineError> {
        match artifact {
            Artifact::Universe => Ok(self.read_universe()?.into_iter().map(|a| a.symbol).collect()),
            _ => self.layout.list_symbols(artifact),
        }
    }

    fn read_universe(&self) -> Result<Vec<RankedAsset>, PipelineError> {
        read_table(&self.layout.universe(), "universe", Artifact::Universe)
    }

    fn write_universe(&self, assets: &[RankedAsset]) -> Result<(), PipelineError> {
        write_table(&self.layout.universe(), assets)
    }

    fn read_bars(&self, symbol: &str) -> Result<Vec<Bar>, PipelineError> {
        let mut bars: Vec<Bar> = read_table(&self.table_path(Artifact::Ohlcv, symbol)?, symbol, Artifact::Ohlcv)?;
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn write_bars(&self, symbol: &str, bars: &[Bar]) -> Result<(), PipelineError> {
        write_table(&self.table_path(Artifact::Ohlcv, symbol)?, bars)
    }

    fn read_features(&self, symbol: &str) -> Result<Vec<FeatureRow>, PipelineError> {
        read_table(&self.table_path(Artifact::Features, symbol)?, symbol, Artifact::Features)
    }

    fn write_features(&self, symbol: &str, rows: &[FeatureRow]) -> Result<(), PipelineError> {
        write_table(&self.table_path(Artifact::Features, symbol)?, rows)
    }

    fn read_labels(&self, symbol: &str) -> Result<Vec<LabeledRow>, PipelineError> {
        let records: Vec<LabelRecord> =
            read_table(&self.table_path(Artifact::Labels, symbol)?, symbol, Artifact::Labels)?;
        Ok(records.into_iter().map(LabeledRow::from).collect())
    }

    fn write_labels(&self, symbol: &str, rows: &[LabeledRow]) -> Result<(), PipelineError> {
        let records: Vec<LabelRecord> = rows.iter().map(LabelRecord::from).collect();
        write_table(&self.table_path(Artifact::Labels, symbol)?, &records)
    }

    fn write_fold_reports(&self, symbol: &str, folds: &[FoldReport]) -> Result<(), PipelineError> {
        let records: Vec<FoldRecord> = folds.iter().map(FoldRecord::from).collect();
        write_table(&self.layout.fold_reports(symbol), &records)
    }

    fn read_signals(&self) -> Result<Vec<String>, PipelineError> {
        let path = self.layout.signals();
        if !path.is_file() {
            return Err(PipelineError::not_found("buy list", Artifact::Signals));
        }
        let bytes = fs::read(&path).map_err(|e| storage_error(&path, e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::data_shape("buy list", format!("{}: {}", path.display(), e)))
    }

    fn write_signals(&self, symbols: &[String]) -> Result<PathBuf, PipelineError> {
        let path = self.layout.signals();
        ensure_parent(&path)?;
        let bytes = serde_json::to_vec(symbols).map_err(|e| storage_error(&path, e))?;
        fs::write(&path, bytes).map_err(|e| storage_error(&path, e))?;
        Ok(path)
    }

    fn write_simulation(
        &self,
        date: NaiveDate,
        positions: &[SimulatedPosition],
    ) -> Result<PathBuf, PipelineError> {
        let path = self.layout.simulation(date);
        write_table(&path, positions)?;
        Ok(path)
    }

    fn read_simulation(&self, path: &Path) -> Result<Vec<SimulatedPosition>, PipelineError> {
        let label = path.display().to_string();
        read_table(path, &label, Artifact::Simulation)
    }

    fn write_evaluation(
        &self,
        source: &Path,
        rows: &[EvaluatedPosition],
    ) -> Result<PathBuf, PipelineError> {
        let path = evaluation_path(source);
        write_table(&path, rows)?;
        Ok(path)
    }
}
