//! Hypothetical equal-weight purchase of buy-signaled symbols, and its later
//! mark-to-market evaluation.
//!
//! The investment is split by the number of signaled symbols, including any
//! that later fail pricing; a failed symbol's share is simply not spent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::batch::{run_sequential, SkippedSymbol};
use crate::domain::error::PipelineError;
use crate::domain::market::QuotePreference;
use crate::ports::market_port::MarketPort;

pub const DEFAULT_TAKER_FEE: f64 = 0.001;
pub const DEFAULT_NETWORK_FEE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    pub default_taker_fee: f64,
    pub default_network_fee: f64,
    /// Flat per-withdrawal fee in quote currency, keyed by upper-case symbol.
    pub network_fees: BTreeMap<String, f64>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            default_taker_fee: DEFAULT_TAKER_FEE,
            default_network_fee: DEFAULT_NETWORK_FEE,
            network_fees: BTreeMap::from([("BTC".to_string(), 5.0), ("ETH".to_string(), 10.0)]),
        }
    }
}

impl FeeSchedule {
    pub fn network_fee(&self, symbol: &str) -> f64 {
        self.network_fees
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or(self.default_network_fee)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedPosition {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub asset_cost: f64,
    pub exchange_fee: f64,
    pub network_fee: f64,
    pub total_cost: f64,
}

impl SimulatedPosition {
    /// Prices one position; `price` must be positive.
    pub fn open(symbol: &str, per_asset: f64, price: f64, fee_rate: f64, network_fee: f64) -> Self {
        let exchange_fee = fee_rate * per_asset;
        Self {
            symbol: symbol.to_string(),
            price,
            quantity: per_asset / price,
            asset_cost: per_asset,
            exchange_fee,
            network_fee,
            total_cost: per_asset + exchange_fee + network_fee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedPosition {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub asset_cost: f64,
    pub exchange_fee: f64,
    pub network_fee: f64,
    pub total_cost: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub profit: f64,
    pub profit_pct: f64,
}

impl EvaluatedPosition {
    pub fn mark(position: &SimulatedPosition, current_price: f64) -> Self {
        let current_value = current_price * position.quantity;
        let profit = current_value - position.total_cost;
        let profit_pct = if position.total_cost == 0.0 {
            0.0
        } else {
            profit / position.total_cost
        };
        Self {
            symbol: position.symbol.clone(),
            price: position.price,
            quantity: position.quantity,
            asset_cost: position.asset_cost,
            exchange_fee: position.exchange_fee,
            network_fee: position.network_fee,
            total_cost: position.total_cost,
            current_price,
            current_value,
            profit,
            profit_pct,
        }
    }
}

#[derive(Debug)]
pub struct SimulationOutcome {
    pub per_asset: f64,
    pub positions: Vec<SimulatedPosition>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Simulates buying `symbols` today with `investment` split equally.
pub fn simulate_purchase(
    symbols: &[String],
    investment: f64,
    market: &dyn MarketPort,
    quotes: &QuotePreference,
    fees: &FeeSchedule,
) -> Result<SimulationOutcome, PipelineError> {
    if symbols.is_empty() {
        return Ok(SimulationOutcome {
            per_asset: 0.0,
            positions: Vec::new(),
            skipped: Vec::new(),
        });
    }

    let per_asset = investment / symbols.len() as f64;
    let batch = run_sequential(symbols, |symbol| {
        let price = quotes.fetch_price(market, symbol)?;
        let fee_rate = quotes.fetch_taker_fee(market, symbol).unwrap_or_else(|| {
            tracing::debug!(symbol, rate = fees.default_taker_fee, "using default taker fee");
            fees.default_taker_fee
        });
        Ok(SimulatedPosition::open(
            symbol,
            per_asset,
            price,
            fee_rate,
            fees.network_fee(symbol),
        ))
    })?;

    Ok(SimulationOutcome {
        per_asset,
        positions: batch.completed.into_iter().map(|(_, p)| p).collect(),
        skipped: batch.skipped,
    })
}

#[derive(Debug)]
pub struct EvaluationOutcome {
    pub rows: Vec<EvaluatedPosition>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Re-prices each simulated position at the current market price.
pub fn evaluate_positions(
    positions: &[SimulatedPosition],
    market: &dyn MarketPort,
    quotes: &QuotePreference,
) -> Result<EvaluationOutcome, PipelineError> {
    let symbols: Vec<String> = positions.iter().map(|p| p.symbol.clone()).collect();
    let mut remaining = positions.iter();
    let batch = run_sequential(&symbols, |symbol| {
        let position = remaining
            .next()
            .ok_or_else(|| PipelineError::data_shape(symbol, "position list exhausted"))?;
        let current = quotes.fetch_price(market, symbol)?;
        Ok(EvaluatedPosition::mark(position, current))
    })?;

    Ok(EvaluationOutcome {
        rows: batch.completed.into_iter().map(|(_, r)| r).collect(),
        skipped: batch.skipped,
    })
}

/// Dollar totals converted at a single rate.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTotals {
    pub currency: String,
    /// Units of `currency` per dollar.
    pub rate: f64,
    pub total_cost: f64,
    pub current_value: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluationSummary {
    pub total_cost: f64,
    pub current_value: f64,
    pub profit: f64,
    pub profit_pct: f64,
    pub local: Option<LocalTotals>,
}

impl EvaluationSummary {
    /// Totals over the evaluated rows; the percentage is derived from the
    /// summed cost, not averaged across rows.
    pub fn from_rows(rows: &[EvaluatedPosition]) -> Self {
        let total_cost: f64 = rows.iter().map(|r| r.total_cost).sum();
        let current_value: f64 = rows.iter().map(|r| r.current_value).sum();
        let profit = current_value - total_cost;
        Self {
            total_cost,
            current_value,
            profit,
            profit_pct: if total_cost == 0.0 { 0.0 } else { profit / total_cost },
            local: None,
        }
    }

    pub fn with_local(self, currency: &str, rate: f64) -> Self {
        let local = LocalTotals {
            currency: currency.to_uppercase(),
            rate,
            total_cost: self.total_cost * rate,
            current_value: self.current_value * rate,
            profit: self.profit * rate,
        };
        Self {
            local: Some(local),
            ..self
        }
    }
}
