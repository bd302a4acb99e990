//! Resolved run settings, built once from a [`ConfigPort`] and passed down by
//! reference.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::config_validation::validate_pipeline_config;
use crate::domain::error::PipelineError;
use crate::domain::market::QuotePreference;
use crate::domain::model::ForestConfig;
use crate::domain::simulation::FeeSchedule;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_RANKING_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSettings {
    pub base_url: String,
    pub ranking_url: String,
    pub vs_currency: String,
    pub top_n: usize,
    pub timeout: Duration,
    pub throttle: Duration,
    pub ohlcv_limit: usize,
    pub quotes: QuotePreference,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ranking_url: DEFAULT_RANKING_URL.to_string(),
            vs_currency: "usd".to_string(),
            top_n: 50,
            timeout: Duration::from_secs(10),
            throttle: Duration::from_millis(1200),
            ohlcv_limit: 1000,
            quotes: QuotePreference::default(),
            api_key: None,
            api_secret: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub investment: f64,
    pub fees: FeeSchedule,
    /// Currency evaluation totals are also reported in, priced via `USDT/<currency>`.
    pub local_currency: Option<String>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            investment: 1000.0,
            fees: FeeSchedule::default(),
            local_currency: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub market: MarketSettings,
    pub forest: ForestConfig,
    pub simulation: SimulationSettings,
    /// Worker threads for per-symbol stages; 0 means one per core.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            market: MarketSettings::default(),
            forest: ForestConfig::default(),
            simulation: SimulationSettings::default(),
            workers: 0,
        }
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PipelineConfig {
    /// Validates `config` and resolves every setting, using defaults for
    /// absent keys.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PipelineError> {
        validate_pipeline_config(config)?;
        let defaults = PipelineConfig::default();

        let quotes = non_empty(config, "market", "quote_currencies")
            .map(|raw| {
                QuotePreference::new(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|q| !q.is_empty())
                        .map(str::to_string)
                        .collect(),
                )
            })
            .unwrap_or_default();

        let market = MarketSettings {
            base_url: non_empty(config, "market", "base_url").unwrap_or(defaults.market.base_url),
            ranking_url: non_empty(config, "market", "ranking_url")
                .unwrap_or(defaults.market.ranking_url),
            vs_currency: non_empty(config, "market", "vs_currency")
                .unwrap_or(defaults.market.vs_currency),
            top_n: config.get_int("market", "top_n", 50) as usize,
            timeout: Duration::from_secs(config.get_int("market", "timeout_secs", 10) as u64),
            throttle: Duration::from_millis(config.get_int("market", "throttle_ms", 1200) as u64),
            ohlcv_limit: config.get_int("market", "ohlcv_limit", 1000) as usize,
            quotes,
            api_key: non_empty(config, "market", "api_key"),
            api_secret: non_empty(config, "market", "api_secret"),
        };

        let max_depth = config.get_int("model", "max_depth", 0);
        let forest = ForestConfig {
            n_estimators: config.get_int("model", "n_estimators", 100) as usize,
            max_depth: (max_depth > 0).then_some(max_depth as usize),
            min_samples_split: config.get_int("model", "min_samples_split", 2) as usize,
            min_samples_leaf: config.get_int("model", "min_samples_leaf", 1) as usize,
            seed: config.get_int("model", "seed", 42) as u64,
            ..defaults.forest
        };

        let mut network_fees: BTreeMap<String, f64> = defaults.simulation.fees.network_fees;
        for key in config.section_keys("network_fees") {
            let fee = config.get_double("network_fees", &key, 0.0);
            network_fees.insert(key.to_uppercase(), fee);
        }

        let simulation = SimulationSettings {
            investment: config.get_double("simulation", "investment", 1000.0),
            fees: FeeSchedule {
                default_taker_fee: config.get_double("simulation", "default_taker_fee", 0.001),
                default_network_fee: config.get_double("simulation", "default_network_fee", 2.0),
                network_fees,
            },
            local_currency: non_empty(config, "simulation", "local_currency").map(|c| c.to_uppercase()),
        };

        Ok(Self {
            data_dir: non_empty(config, "data", "dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            market,
            forest,
            simulation,
            workers: config.get_int("pipeline", "workers", 0) as usize,
        })
    }
}
