//! Market data ports: the exchange and the market-cap ranking source.

use crate::domain::error::PipelineError;
use crate::domain::market::TradingPair;
use crate::domain::ohlcv::Bar;
use crate::domain::universe::RankedAsset;

/// Exchange-facing lookups. Every failure is reported as
/// `PipelineError::MarketLookup`, timeouts included.
pub trait MarketPort {
    fn has_pair(&self, pair: &TradingPair) -> Result<bool, PipelineError>;

    /// Last traded price, `None` when the exchange has no ticker value.
    fn last_price(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError>;

    /// Taker fee rate as a fraction (0.001 = 0.1%).
    fn taker_fee(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError>;

    fn daily_bars(&self, pair: &TradingPair, limit: usize) -> Result<Vec<Bar>, PipelineError>;
}

pub trait RankingPort {
    /// Assets ordered by descending market cap.
    fn top_assets(&self, vs_currency: &str, count: usize) -> Result<Vec<RankedAsset>, PipelineError>;
}
