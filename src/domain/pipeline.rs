//! Batch stages over the symbol universe.
//!
//! Each stage reads its inputs through the ports, runs per symbol, writes its
//! artifact and returns a report of completed and skipped symbols. Stages that
//! touch the exchange run sequentially; the rest use the worker pool.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::batch::{run_sequential, BatchReport, SkippedSymbol, WorkerPool};
use crate::domain::error::{Artifact, PipelineError};
use crate::domain::features::{generate_features, LARGEST_WINDOW};
use crate::domain::inference::{infer_signal, InferenceReport};
use crate::domain::label::{generate_labels, join_by_date, LabelPolicy};
use crate::domain::market::fetch_local_rate;
use crate::domain::model::ForestConfig;
use crate::domain::settings::{MarketSettings, SimulationSettings};
use crate::domain::simulation::{
    evaluate_positions, simulate_purchase, EvaluatedPosition, EvaluationSummary, SimulatedPosition,
};
use crate::domain::universe::{normalize_universe, RankedAsset};
use crate::domain::walk_forward::{train_walk_forward, FoldReport, MIN_ROWS};
use crate::ports::data_port::DataPort;
use crate::ports::market_port::{MarketPort, RankingPort};
use crate::ports::model_port::ModelPort;

#[derive(Debug)]
pub struct UniverseReport {
    pub assets: Vec<RankedAsset>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetches the market-cap ranking and stores the normalized universe.
pub fn fetch_universe(
    ranking: &dyn RankingPort,
    store: &dyn DataPort,
    settings: &MarketSettings,
) -> Result<UniverseReport, PipelineError> {
    let fetched = ranking.top_assets(&settings.vs_currency, settings.top_n)?;
    let (assets, skipped) = normalize_universe(fetched);
    store.write_universe(&assets)?;
    tracing::info!(assets = assets.len(), skipped = skipped.len(), "universe stored");
    Ok(UniverseReport { assets, skipped })
}

/// Downloads daily bars for every universe symbol through its preferred pair.
pub fn fetch_ohlcv(
    market: &dyn MarketPort,
    store: &dyn DataPort,
    settings: &MarketSettings,
) -> Result<BatchReport<usize>, PipelineError> {
    let symbols: Vec<String> = store
        .read_universe()?
        .into_iter()
        .map(|a| a.symbol)
        .collect();

    run_sequential(&symbols, |symbol| {
        let pair = settings.quotes.resolve_pair(market, symbol)?;
        let bars = market.daily_bars(&pair, settings.ohlcv_limit)?;
        if bars.is_empty() {
            return Err(PipelineError::market(symbol, format!("{pair} returned no bars")));
        }
        store.write_bars(symbol, &bars)?;
        tracing::info!(symbol, %pair, bars = bars.len(), "bars stored");
        Ok(bars.len())
    })
}

fn symbols_with(store: &dyn DataPort, artifact: Artifact) -> Result<Vec<String>, PipelineError> {
    let symbols = store.list_symbols(artifact)?;
    if symbols.is_empty() {
        tracing::warn!(%artifact, "no stored tables to process");
    }
    Ok(symbols)
}

/// Builds a feature table for every symbol with stored bars.
pub fn build_features(store: &dyn DataPort, pool: &WorkerPool) -> Result<BatchReport<usize>, PipelineError> {
    let symbols = symbols_with(store, Artifact::Ohlcv)?;
    pool.run(&symbols, |symbol| {
        let bars = store.read_bars(symbol)?;
        let rows = generate_features(symbol, &bars)?;
        if rows.is_empty() {
            return Err(PipelineError::InsufficientHistory {
                symbol: symbol.to_string(),
                rows: bars.len(),
                minimum: LARGEST_WINDOW,
            });
        }
        store.write_features(symbol, &rows)?;
        tracing::debug!(symbol, rows = rows.len(), "features stored");
        Ok(rows.len())
    })
}

/// Labels every stored feature table.
pub fn build_labels(
    store: &dyn DataPort,
    pool: &WorkerPool,
    policy: &LabelPolicy,
) -> Result<BatchReport<usize>, PipelineError> {
    let symbols = symbols_with(store, Artifact::Features)?;
    pool.run(&symbols, |symbol| {
        let rows = store.read_features(symbol)?;
        let labeled = generate_labels(&rows, policy);
        if labeled.is_empty() {
            return Err(PipelineError::InsufficientHistory {
                symbol: symbol.to_string(),
                rows: rows.len(),
                minimum: policy.horizon + 1,
            });
        }
        store.write_labels(symbol, &labeled)?;
        tracing::debug!(symbol, rows = labeled.len(), "labels stored");
        Ok(labeled.len())
    })
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub rows: usize,
    pub folds: Vec<FoldReport>,
}

/// Walk-forward trains a model for every symbol with both a feature and a
/// label table, persisting the final model and the fold reports.
pub fn train_models(
    store: &dyn DataPort,
    models: &dyn ModelPort,
    pool: &WorkerPool,
    config: &ForestConfig,
) -> Result<BatchReport<TrainingSummary>, PipelineError> {
    let symbols = symbols_with(store, Artifact::Labels)?;
    pool.run(&symbols, |symbol| {
        let features = store.read_features(symbol)?;
        let labels = store.read_labels(symbol)?;
        let joined = join_by_date(&features, &labels);
        if joined.len() < MIN_ROWS {
            return Err(PipelineError::InsufficientHistory {
                symbol: symbol.to_string(),
                rows: joined.len(),
                minimum: MIN_ROWS,
            });
        }

        let outcome = train_walk_forward(symbol, &joined, config)?;
        models.save(&outcome.model)?;
        store.write_fold_reports(symbol, &outcome.folds)?;
        tracing::info!(symbol, rows = joined.len(), "model trained");
        Ok(TrainingSummary {
            rows: joined.len(),
            folds: outcome.folds,
        })
    })
}

/// Scores the latest row of every feature table and stores the sorted buy
/// list, even when it is empty.
pub fn run_inference(
    store: &dyn DataPort,
    models: &dyn ModelPort,
    pool: &WorkerPool,
) -> Result<(InferenceReport, PathBuf), PipelineError> {
    let symbols = symbols_with(store, Artifact::Features)?;
    let batch = pool.run(&symbols, |symbol| {
        let rows = store.read_features(symbol)?;
        if rows.is_empty() {
            return Err(PipelineError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let model = models.load(symbol)?;
        infer_signal(symbol, &rows, &model)
    })?;

    let report = InferenceReport::from_batch(batch);
    let path = store.write_signals(&report.buy)?;
    tracing::info!(buy = report.buy.len(), hold = report.hold.len(), "signals stored");
    Ok((report, path))
}

#[derive(Debug)]
pub struct SimulationRun {
    pub per_asset: f64,
    pub positions: Vec<SimulatedPosition>,
    pub skipped: Vec<SkippedSymbol>,
    /// `None` when nothing could be priced and no file was written.
    pub path: Option<PathBuf>,
}

/// Simulates buying today's signals and stores the record set for `today`.
pub fn run_simulation(
    store: &dyn DataPort,
    market: &dyn MarketPort,
    market_settings: &MarketSettings,
    settings: &SimulationSettings,
    today: NaiveDate,
) -> Result<SimulationRun, PipelineError> {
    let symbols = store.read_signals()?;
    let outcome = simulate_purchase(
        &symbols,
        settings.investment,
        market,
        &market_settings.quotes,
        &settings.fees,
    )?;

    let path = if outcome.positions.is_empty() {
        None
    } else {
        Some(store.write_simulation(today, &outcome.positions)?)
    };

    Ok(SimulationRun {
        per_asset: outcome.per_asset,
        positions: outcome.positions,
        skipped: outcome.skipped,
        path,
    })
}

#[derive(Debug)]
pub struct EvaluationRun {
    pub rows: Vec<EvaluatedPosition>,
    pub summary: EvaluationSummary,
    pub skipped: Vec<SkippedSymbol>,
    pub path: Option<PathBuf>,
}

/// Marks a stored simulation to market and writes the evaluation beside it.
///
/// With `local_currency` set, the dollar rate is fetched first and a failed
/// lookup aborts before anything is repriced or written.
pub fn run_evaluation(
    store: &dyn DataPort,
    market: &dyn MarketPort,
    market_settings: &MarketSettings,
    local_currency: Option<&str>,
    simulation: &Path,
) -> Result<EvaluationRun, PipelineError> {
    let positions = store.read_simulation(simulation)?;
    let local_rate = match local_currency {
        Some(currency) => {
            let rate = fetch_local_rate(market, currency)?;
            tracing::info!(currency, rate, "local currency rate");
            Some((currency, rate))
        }
        None => None,
    };
    let outcome = evaluate_positions(&positions, market, &market_settings.quotes)?;

    let path = if outcome.rows.is_empty() {
        None
    } else {
        Some(store.write_evaluation(simulation, &outcome.rows)?)
    };

    let mut summary = EvaluationSummary::from_rows(&outcome.rows);
    if let Some((currency, rate)) = local_rate {
        summary = summary.with_local(currency, rate);
    }

    Ok(EvaluationRun {
        summary,
        rows: outcome.rows,
        skipped: outcome.skipped,
        path,
    })
}
