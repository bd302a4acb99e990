//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};

use crate::adapters::binance_adapter::BinanceAdapter;
use crate::adapters::coingecko_adapter::CoinGeckoAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::model_store::JsonModelStore;
use crate::domain::batch::{BatchReport, SkippedSymbol, WorkerPool};
use crate::domain::error::PipelineError;
use crate::domain::label::LabelPolicy;
use crate::domain::pipeline::{self, EvaluationRun, TrainingSummary};
use crate::domain::settings::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "coinsignal", about = "Daily crypto buy-signal pipeline")]
pub struct Cli {
    /// INI configuration file; built-in defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the market-cap ranked universe
    #[command(name = "fetch-top50")]
    FetchTop50,
    /// Download daily bars for every universe symbol
    FetchOhlcv,
    /// Build indicator feature tables
    Features,
    /// Build forward-return label tables
    Labels,
    /// Walk-forward train one model per symbol
    Train,
    /// Score the latest row of each symbol and store the buy list
    Infer,
    /// Run fetch-top50 through infer in order
    All,
    /// Paper-purchase today's buy list
    Simulate {
        /// Total amount split evenly across the buy list
        #[arg(long)]
        investment: Option<f64>,
    },
    /// Mark a stored simulation to market
    Evaluate {
        /// Simulation CSV written by `simulate`
        file: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_settings(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let result = match cli.command {
        Command::FetchTop50 => run_fetch_top50(&config),
        Command::FetchOhlcv => run_fetch_ohlcv(&config),
        Command::Features => run_features(&config),
        Command::Labels => run_labels(&config),
        Command::Train => run_train(&config),
        Command::Infer => run_infer(&config),
        Command::All => run_all(&config),
        Command::Simulate { investment } => run_simulate(&config, investment),
        Command::Evaluate { file } => run_evaluate(&config, &file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(err: &PipelineError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_settings(path: Option<&Path>) -> Result<PipelineConfig, PipelineError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            PipelineConfig::from_config(&FileConfigAdapter::from_file(path)?)
        }
        None => PipelineConfig::from_config(&FileConfigAdapter::empty()),
    }
}

fn stores(config: &PipelineConfig) -> (CsvAdapter, JsonModelStore) {
    (
        CsvAdapter::new(config.data_dir.clone()),
        JsonModelStore::new(config.data_dir.clone()),
    )
}

fn worker_pool(config: &PipelineConfig) -> Result<WorkerPool, PipelineError> {
    let pool = WorkerPool::new(config.workers)?;
    tracing::debug!(workers = pool.threads(), "worker pool ready");
    Ok(pool)
}

fn print_skipped(stage: &str, skipped: &[SkippedSymbol]) {
    if skipped.is_empty() {
        return;
    }
    eprintln!("{stage}: skipped {} symbol(s)", skipped.len());
    for s in skipped {
        eprintln!("  {:<10} {}", s.symbol, s.error);
    }
}

fn print_batch<T>(stage: &str, report: &BatchReport<T>) {
    println!(
        "{stage}: {} of {} symbol(s) done",
        report.completed.len(),
        report.attempted()
    );
    print_skipped(stage, &report.skipped);
}

fn run_fetch_top50(config: &PipelineConfig) -> Result<(), PipelineError> {
    let (store, _) = stores(config);
    let ranking = CoinGeckoAdapter::new(&config.market)?;
    let report = pipeline::fetch_universe(&ranking, &store, &config.market)?;
    println!("fetch-top50: {} asset(s) stored", report.assets.len());
    print_skipped("fetch-top50", &report.skipped);
    Ok(())
}

fn run_fetch_ohlcv(config: &PipelineConfig) -> Result<(), PipelineError> {
    let (store, _) = stores(config);
    let market = BinanceAdapter::new(&config.market)?;
    let report = pipeline::fetch_ohlcv(&market, &store, &config.market)?;
    print_batch("fetch-ohlcv", &report);
    Ok(())
}

fn run_features(config: &PipelineConfig) -> Result<(), PipelineError> {
    let (store, _) = stores(config);
    let pool = worker_pool(config)?;
    let report = pipeline::build_features(&store, &pool)?;
    print_batch("features", &report);
    Ok(())
}

fn run_labels(config: &PipelineConfig) -> Result<(), PipelineError> {
    let (store, _) = stores(config);
    let pool = worker_pool(config)?;
    let report = pipeline::build_labels(&store, &pool, &LabelPolicy::default())?;
    print_batch("labels", &report);
    Ok(())
}

fn print_folds(symbol: &str, summary: &TrainingSummary) {
    println!("{symbol}: {} row(s), {} fold(s)", summary.rows, summary.folds.len());
    for fold in &summary.folds {
        println!(
            "  fold {} train {} ({}..{}) test {} ({}..{}) macro f1 {:.3}",
            fold.fold,
            fold.train_rows,
            fold.train_start,
            fold.train_end,
            fold.test_rows,
            fold.test_start,
            fold.test_end,
            fold.report.macro_f1()
        );
        for line in fold.report.to_string().lines() {
            println!("    {line}");
        }
    }
}

fn run_train(config: &PipelineConfig) -> Result<(), PipelineError> {
    let (store, models) = stores(config);
    let pool = worker_pool(config)?;
    let report = pipeline::train_models(&store, &models, &pool, &config.forest)?;
    for (symbol, summary) in &report.completed {
        print_folds(symbol, summary);
    }
    print_batch("train", &report);
    Ok(())
}

fn run_infer(config: &PipelineConfig) -> Result<(), PipelineError> {
    let (store, models) = stores(config);
    let pool = worker_pool(config)?;
    let (report, path) = pipeline::run_inference(&store, &models, &pool)?;
    if report.buy.is_empty() {
        println!("infer: no buy signals");
    }
    for symbol in &report.buy {
        let probability = report.probabilities.get(symbol).copied().unwrap_or_default();
        println!("infer: buy {symbol:<10} p={probability:.3}");
    }
    println!("infer: {} hold, list written to {}", report.hold.len(), path.display());
    print_skipped("infer", &report.skipped);
    Ok(())
}

fn run_all(config: &PipelineConfig) -> Result<(), PipelineError> {
    run_fetch_top50(config)?;
    run_fetch_ohlcv(config)?;
    run_features(config)?;
    run_labels(config)?;
    run_train(config)?;
    run_infer(config)
}

fn run_simulate(config: &PipelineConfig, investment: Option<f64>) -> Result<(), PipelineError> {
    let mut settings = config.simulation.clone();
    if let Some(amount) = investment {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PipelineError::ConfigInvalid {
                section: "simulation".to_string(),
                key: "investment".to_string(),
                reason: format!("must be positive, got {amount}"),
            });
        }
        settings.investment = amount;
    }

    let (store, _) = stores(config);
    let market = BinanceAdapter::new(&config.market)?;
    let today = Local::now().date_naive();
    let run = pipeline::run_simulation(&store, &market, &config.market, &settings, today)?;

    println!("simulate: {:.2} per asset", run.per_asset);
    for p in &run.positions {
        println!(
            "  {:<10} price {:>14.6} qty {:>16.8} fee {:>10.4} network {:>8.2} total {:>12.2}",
            p.symbol, p.price, p.quantity, p.exchange_fee, p.network_fee, p.total_cost
        );
    }
    match &run.path {
        Some(path) => println!("simulate: {} position(s) written to {}", run.positions.len(), path.display()),
        None => println!("simulate: nothing purchased"),
    }
    print_skipped("simulate", &run.skipped);
    Ok(())
}

fn print_evaluation(run: &EvaluationRun) {
    println!(
        "{:<10} {:>12} {:>14} {:>12} {:>9}",
        "symbol", "cost", "value", "profit", "profit %"
    );
    for row in &run.rows {
        println!(
            "{:<10} {:>12.2} {:>14.2} {:>12.2} {:>9.2}",
            row.symbol,
            row.total_cost,
            row.current_value,
            row.profit,
            row.profit_pct * 100.0
        );
    }
    let total = &run.summary;
    println!(
        "{:<10} {:>12.2} {:>14.2} {:>12.2} {:>9.2}",
        "TOTAL",
        total.total_cost,
        total.current_value,
        total.profit,
        total.profit_pct * 100.0
    );
    if let Some(local) = &total.local {
        println!("1 USDT = {:.4} {}", local.rate, local.currency);
        println!(
            "{:<10} {:>12.2} {:>14.2} {:>12.2}",
            local.currency, local.total_cost, local.current_value, local.profit
        );
    }
}

fn run_evaluate(config: &PipelineConfig, file: &Path) -> Result<(), PipelineError> {
    let (store, _) = stores(config);
    let market = BinanceAdapter::new(&config.market)?;
    let run = pipeline::run_evaluation(
        &store,
        &market,
        &config.market,
        config.simulation.local_currency.as_deref(),
        file,
    )?;
    print_evaluation(&run);
    if let Some(path) = &run.path {
        println!("evaluate: written to {}", path.display());
    }
    print_skipped("evaluate", &run.skipped);
    Ok(())
}
