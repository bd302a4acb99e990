//! CLI integration tests against an on-disk data directory.
//!
//! Tests cover:
//! - features → labels → train → infer through `cli::run` with an INI file
//! - Exit codes for invalid configuration and missing artifacts

mod common;

use clap::Parser;
use coinsignal::adapters::csv_adapter::CsvAdapter;
use coinsignal::cli::{self, Cli};
use coinsignal::ports::data_port::DataPort;
use common::*;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_ini(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("coinsignal.ini");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "[data]\ndir = {}\n\n{body}", dir.join("data").display()).unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> ExitCode {
    let mut argv = vec!["coinsignal", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

fn same(a: ExitCode, b: ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}

const MODEL_SECTION: &str = "[model]\nn_estimators = 10\nseed = 7\n\n[pipeline]\nworkers = 2\n";

#[test]
fn offline_stages_write_their_artifacts() {
    let tmp = TempDir::new().unwrap();
    let config = write_ini(tmp.path(), MODEL_SECTION);
    let data = tmp.path().join("data");
    let store = CsvAdapter::new(data.clone());
    store.write_bars("BTC", &wave_bars(220)).unwrap();
    store.write_bars("ETH", &wave_bars(45)).unwrap();

    assert!(same(run(&config, &["features"]), ExitCode::SUCCESS));
    assert!(data.join("features/BTC_feat.csv").is_file());
    assert!(!data.join("features/ETH_feat.csv").exists());

    assert!(same(run(&config, &["labels"]), ExitCode::SUCCESS));
    assert!(data.join("labels/BTC_label.csv").is_file());

    assert!(same(run(&config, &["train"]), ExitCode::SUCCESS));
    assert!(data.join("models/BTC_model.json").is_file());
    assert!(data.join("reports/BTC_folds.csv").is_file());

    assert!(same(run(&config, &["infer"]), ExitCode::SUCCESS));
    let signals = store.read_signals().unwrap();
    assert!(signals.iter().all(|s| s == "BTC"));
}

#[test]
fn invalid_model_config_exits_with_config_code() {
    let tmp = TempDir::new().unwrap();
    let config = write_ini(tmp.path(), "[model]\nn_estimators = 0\n");
    assert!(same(run(&config, &["features"]), ExitCode::from(2)));
}

#[test]
fn evaluating_missing_simulation_exits_with_data_code() {
    let tmp = TempDir::new().unwrap();
    let config = write_ini(tmp.path(), "");
    let missing = tmp.path().join("data/simulations/purchase_2020-01-01.csv");
    assert!(same(
        run(&config, &["evaluate", missing.to_str().unwrap()]),
        ExitCode::from(5)
    ));
}

#[test]
fn simulate_without_buy_list_exits_with_data_code() {
    let tmp = TempDir::new().unwrap();
    let config = write_ini(tmp.path(), "");
    assert!(same(run(&config, &["simulate", "--investment", "100"]), ExitCode::from(5)));
}
