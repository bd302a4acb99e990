#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use coinsignal::domain::error::{Artifact, PipelineError};
use coinsignal::domain::features::FeatureRow;
use coinsignal::domain::label::LabeledRow;
use coinsignal::domain::market::TradingPair;
use coinsignal::domain::model::Model;
pub use coinsignal::domain::ohlcv::Bar;
use coinsignal::domain::simulation::{EvaluatedPosition, SimulatedPosition};
use coinsignal::domain::universe::RankedAsset;
use coinsignal::domain::walk_forward::FoldReport;
use coinsignal::ports::data_port::DataPort;
use coinsignal::ports::market_port::MarketPort;
use coinsignal::ports::model_port::ModelPort;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn start() -> NaiveDate {
    date(2023, 1, 1)
}

/// Daily bars from [`start`] with the given closes; open/high/low hug the
/// close and volume varies so every indicator has signal.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let day = start() + Duration::days(i as i64);
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: day.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis(),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1_000.0 + (i % 7) as f64 * 150.0,
                date: day,
            }
        })
        .collect()
}

/// A deterministic oscillating series: a slow sine swing on a gentle trend,
/// so both label classes appear.
pub fn wave_bars(n: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 12.0 * (t / 9.0).sin() + 3.0 * (t / 2.3).cos()
        })
        .collect();
    bars_from_closes(&closes)
}

#[derive(Default)]
pub struct MemoryStore {
    pub universe: Mutex<Vec<RankedAsset>>,
    pub bars: Mutex<BTreeMap<String, Vec<Bar>>>,
    pub features: Mutex<BTreeMap<String, Vec<FeatureRow>>>,
    pub labels: Mutex<BTreeMap<String, Vec<LabeledRow>>>,
    pub folds: Mutex<BTreeMap<String, Vec<FoldReport>>>,
    pub signals: Mutex<Option<Vec<String>>>,
    pub simulations: Mutex<BTreeMap<PathBuf, Vec<SimulatedPosition>>>,
    pub evaluations: Mutex<BTreeMap<PathBuf, Vec<EvaluatedPosition>>>,
}

impl MemoryStore {
    pub fn with_bars(self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.lock().unwrap().insert(symbol.to_string(), bars);
        self
    }

    pub fn with_signals(self, symbols: &[&str]) -> Self {
        *self.signals.lock().unwrap() = Some(symbols.iter().map(|s| s.to_string()).collect());
        self
    }
}

fn get<T: Clone>(map: &Mutex<BTreeMap<String, Vec<T>>>, symbol: &str, artifact: Artifact) -> Result<Vec<T>, PipelineError> {
    map.lock()
        .unwrap()
        .get(symbol)
        .cloned()
        .ok_or_else(|| PipelineError::not_found(symbol, artifact))
}

impl DataPort for MemoryStore {
    fn list_symbols(&self, artifact: Artifact) -> Result<Vec<String>, PipelineError> {
        Ok(match artifact {
            Artifact::Universe => self.universe.lock().unwrap().iter().map(|a| a.symbol.clone()).collect(),
            Artifact::Ohlcv => self.bars.lock().unwrap().keys().cloned().collect(),
            Artifact::Features => self.features.lock().unwrap().keys().cloned().collect(),
            Artifact::Labels => self.labels.lock().unwrap().keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    fn read_universe(&self) -> Result<Vec<RankedAsset>, PipelineError> {
        Ok(self.universe.lock().unwrap().clone())
    }

    fn write_universe(&self, assets: &[RankedAsset]) -> Result<(), PipelineError> {
        *self.universe.lock().unwrap() = assets.to_vec();
        Ok(())
    }

    fn read_bars(&self, symbol: &str) -> Result<Vec<Bar>, PipelineError> {
        get(&self.bars, symbol, Artifact::Ohlcv)
    }

    fn write_bars(&self, symbol: &str, bars: &[Bar]) -> Result<(), PipelineError> {
        self.bars.lock().unwrap().insert(symbol.to_string(), bars.to_vec());
        Ok(())
    }

    fn read_features(&self, symbol: &str) -> Result<Vec<FeatureRow>, PipelineError> {
        get(&self.features, symbol, Artifact::Features)
    }

    fn write_features(&self, symbol: &str, rows: &[FeatureRow]) -> Result<(), PipelineError> {
        self.features.lock().unwrap().insert(symbol.to_string(), rows.to_vec());
        Ok(())
    }

    fn read_labels(&self, symbol: &str) -> Result<Vec<LabeledRow>, PipelineError> {
        get(&self.labels, symbol, Artifact::Labels)
    }

    fn write_labels(&self, symbol: &str, rows: &[LabeledRow]) -> Result<(), PipelineError> {
        self.labels.lock().unwrap().insert(symbol.to_string(), rows.to_vec());
        Ok(())
    }

    fn write_fold_reports(&self, symbol: &str, folds: &[FoldReport]) -> Result<(), PipelineError> {
        self.folds.lock().unwrap().insert(symbol.to_string(), folds.to_vec());
        Ok(())
    }

    fn read_signals(&self) -> Result<Vec<String>, PipelineError> {
        self.signals
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PipelineError::not_found("buy list", Artifact::Signals))
    }

    fn write_signals(&self, symbols: &[String]) -> Result<PathBuf, PipelineError> {
        *self.signals.lock().unwrap() = Some(symbols.to_vec());
        Ok(PathBuf::from("memory/buy_signals.json"))
    }

    fn write_simulation(
        &self,
        date: NaiveDate,
        positions: &[SimulatedPosition],
    ) -> Result<PathBuf, PipelineError> {
        let path = PathBuf::from(format!("memory/purchase_{date}.csv"));
        self.simulations.lock().unwrap().insert(path.clone(), positions.to_vec());
        Ok(path)
    }

    fn read_simulation(&self, path: &Path) -> Result<Vec<SimulatedPosition>, PipelineError> {
        self.simulations
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| PipelineError::not_found(&path.display().to_string(), Artifact::Simulation))
    }

    fn write_evaluation(
        &self,
        source: &Path,
        rows: &[EvaluatedPosition],
    ) -> Result<PathBuf, PipelineError> {
        let path = source.with_extension("eval.csv");
        self.evaluations.lock().unwrap().insert(path.clone(), rows.to_vec());
        Ok(path)
    }
}

#[derive(Default)]
pub struct MemoryModels {
    pub models: Mutex<HashMap<String, Model>>,
}

impl ModelPort for MemoryModels {
    fn save(&self, model: &Model) -> Result<(), PipelineError> {
        self.models.lock().unwrap().insert(model.symbol.clone(), model.clone());
        Ok(())
    }

    fn load(&self, symbol: &str) -> Result<Model, PipelineError> {
        self.models
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| PipelineError::not_found(symbol, Artifact::Model))
    }
}

/// Exchange double keyed by `BASE/QUOTE`.
#[derive(Default)]
pub struct MockMarket {
    pub prices: HashMap<String, f64>,
    pub fees: HashMap<String, f64>,
    pub bars: HashMap<String, Vec<Bar>>,
    pub unreachable: HashSet<String>,
}

impl MockMarket {
    pub fn with_price(mut self, pair: &str, price: f64) -> Self {
        self.prices.insert(pair.to_string(), price);
        self
    }

    pub fn with_fee(mut self, pair: &str, fee: f64) -> Self {
        self.fees.insert(pair.to_string(), fee);
        self
    }

    pub fn with_bars(mut self, pair: &str, bars: Vec<Bar>) -> Self {
        self.prices.entry(pair.to_string()).or_insert(1.0);
        self.bars.insert(pair.to_string(), bars);
        self
    }

    /// Every lookup for `base` times out.
    pub fn unreachable(mut self, base: &str) -> Self {
        self.unreachable.insert(base.to_string());
        self
    }

    fn check(&self, pair: &TradingPair) -> Result<(), PipelineError> {
        if self.unreachable.contains(&pair.base) {
            return Err(PipelineError::market(&pair.base, "request timed out"));
        }
        Ok(())
    }
}

impl MarketPort for MockMarket {
    fn has_pair(&self, pair: &TradingPair) -> Result<bool, PipelineError> {
        self.check(pair)?;
        Ok(self.prices.contains_key(&pair.to_string()))
    }

    fn last_price(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError> {
        self.check(pair)?;
        Ok(self.prices.get(&pair.to_string()).copied())
    }

    fn taker_fee(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError> {
        self.check(pair)?;
        self.fees
            .get(&pair.to_string())
            .copied()
            .map(Some)
            .ok_or_else(|| PipelineError::market(&pair.base, "fee lookup unavailable"))
    }

    fn daily_bars(&self, pair: &TradingPair, limit: usize) -> Result<Vec<Bar>, PipelineError> {
        self.check(pair)?;
        let bars = self.bars.get(&pair.to_string()).cloned().unwrap_or_default();
        let skip = bars.len().saturating_sub(limit);
        Ok(bars.into_iter().skip(skip).collect())
    }
}
