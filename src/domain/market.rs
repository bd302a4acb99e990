//! Trading pairs and quote-currency preference.
//!
//! A base symbol is priced through the first quote in the preference list
//! whose pair is listed and has a price. Later quotes are only consulted when
//! an earlier one is missing.

use std::fmt;

use crate::domain::error::PipelineError;
use crate::ports::market_port::MarketPort;

pub const DEFAULT_QUOTES: [&str; 3] = ["USDT", "BUSD", "USDC"];

/// Dollar leg of the pair used to convert totals into a local currency.
pub const DOLLAR_QUOTE: &str = "USDT";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    /// Concatenated form used by exchange REST endpoints, e.g. `BTCUSDT`.
    pub fn exchange_symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePreference {
    quotes: Vec<String>,
}

impl Default for QuotePreference {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTES.iter().map(|q| q.to_string()).collect())
    }
}

impl QuotePreference {
    pub fn new(quotes: Vec<String>) -> Self {
        Self {
            quotes: quotes.iter().map(|q| q.trim().to_uppercase()).collect(),
        }
    }

    pub fn quotes(&self) -> &[String] {
        &self.quotes
    }

    pub fn pairs<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = TradingPair> + 'a {
        self.quotes.iter().map(move |q| TradingPair::new(symbol, q))
    }

    /// First listed pair for `symbol`.
    pub fn resolve_pair(
        &self,
        market: &dyn MarketPort,
        symbol: &str,
    ) -> Result<TradingPair, PipelineError> {
        for pair in self.pairs(symbol) {
            if market.has_pair(&pair)? {
                return Ok(pair);
            }
        }
        Err(self.no_pair(symbol))
    }

    /// Last price through the first listed pair that has one.
    pub fn fetch_price(&self, market: &dyn MarketPort, symbol: &str) -> Result<f64, PipelineError> {
        for pair in self.pairs(symbol) {
            if !market.has_pair(&pair)? {
                continue;
            }
            match market.last_price(&pair)? {
                Some(price) if price.is_finite() && price > 0.0 => return Ok(price),
                Some(price) => {
                    return Err(PipelineError::market(
                        symbol,
                        format!("{pair} reported unusable price {price}"),
                    ));
                }
                None => continue,
            }
        }
        Err(self.no_pair(symbol))
    }

    /// Taker fee from the first pair whose lookup succeeds. `None` when every
    /// lookup fails; callers fall back to their default rate.
    pub fn fetch_taker_fee(&self, market: &dyn MarketPort, symbol: &str) -> Option<f64> {
        self.pairs(symbol).find_map(|pair| match market.taker_fee(&pair) {
            Ok(Some(fee)) if fee.is_finite() && fee >= 0.0 => Some(fee),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(%pair, error = %e, "taker fee lookup failed");
                None
            }
        })
    }

    fn no_pair(&self, symbol: &str) -> PipelineError {
        PipelineError::market(
            symbol,
            format!("no priced pair among {}", self.quotes.join(", ")),
        )
    }
}

/// Units of `currency` per dollar, read from the `USDT/<currency>` pair.
pub fn fetch_local_rate(market: &dyn MarketPort, currency: &str) -> Result<f64, PipelineError> {
    let pair = TradingPair::new(DOLLAR_QUOTE, currency);
    if !market.has_pair(&pair)? {
        return Err(PipelineError::market(&pair.to_string(), "pair is not listed"));
    }
    match market.last_price(&pair)? {
        Some(rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
        Some(rate) => Err(PipelineError::market(
            &pair.to_string(),
            format!("unusable rate {rate}"),
        )),
        None => Err(PipelineError::market(&pair.to_string(), "no rate available")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StubMarket {
        prices: HashMap<String, Option<f64>>,
        fees: HashMap<String, f64>,
        unreachable: bool,
    }

    impl StubMarket {
        fn with_price(mut self, pair: &str, price: Option<f64>) -> Self {
            self.prices.insert(pair.to_string(), price);
            self
        }
    }

    impl MarketPort for StubMarket {
        fn has_pair(&self, pair: &TradingPair) -> Result<bool, PipelineError> {
            if self.unreachable {
                return Err(PipelineError::market(&pair.base, "request timed out"));
            }
            Ok(self.prices.contains_key(&pair.to_string()))
        }

        fn last_price(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError> {
            Ok(self.prices.get(&pair.to_string()).copied().flatten())
        }

        fn taker_fee(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError> {
            self.fees
                .get(&pair.to_string())
                .copied()
                .map(Some)
                .ok_or_else(|| PipelineError::market(&pair.base, "no fee"))
        }

        fn daily_bars(&self, _pair: &TradingPair, _limit: usize) -> Result<Vec<Bar>, PipelineError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn pair_formats() {
        let pair = TradingPair::new("btc", "usdt");
        assert_eq!(pair.to_string(), "BTC/USDT");
        assert_eq!(pair.exchange_symbol(), "BTCUSDT");
    }

    #[test]
    fn first_quote_wins() {
        let market = StubMarket::default()
            .with_price("ABC/USDT", Some(2.0))
            .with_price("ABC/USDC", Some(3.0));
        let prefs = QuotePreference::default();
        assert_eq!(prefs.fetch_price(&market, "ABC").unwrap(), 2.0);
        assert_eq!(prefs.resolve_pair(&market, "ABC").unwrap().quote, "USDT");
    }

    #[test]
    fn falls_through_to_later_quote() {
        let market = StubMarket::default()
            .with_price("ABC/USDT", None)
            .with_price("ABC/USDC", Some(3.0));
        assert_eq!(QuotePreference::default().fetch_price(&market, "ABC").unwrap(), 3.0);
    }

    #[test]
    fn missing_pairs_are_market_errors() {
        let err = QuotePreference::default()
            .fetch_price(&StubMarket::default(), "ABC")
            .unwrap_err();
        assert!(matches!(err, PipelineError::MarketLookup { .. }));
        assert!(err.to_string().contains("USDT, BUSD, USDC"));
    }

    #[test]
    fn unreachable_market_propagates() {
        let market = StubMarket {
            unreachable: true,
            ..StubMarket::default()
        };
        let err = QuotePreference::default().fetch_price(&market, "ABC").unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn fee_uses_first_successful_lookup() {
        let mut market = StubMarket::default();
        market.fees.insert("ABC/BUSD".to_string(), 0.00075);
        let prefs = QuotePreference::default();
        assert_eq!(prefs.fetch_taker_fee(&market, "ABC"), Some(0.00075));
        assert_eq!(prefs.fetch_taker_fee(&market, "XYZ"), None);
    }

    #[test]
    fn local_rate_reads_dollar_pair() {
        let market = StubMarket::default()
            .with_price("USDT/BRL", Some(5.2))
            .with_price("USDT/TRY", Some(0.0));
        assert_eq!(fetch_local_rate(&market, "brl").unwrap(), 5.2);
        assert!(matches!(
            fetch_local_rate(&market, "TRY"),
            Err(PipelineError::MarketLookup { .. })
        ));
        let err = fetch_local_rate(&market, "EUR").unwrap_err();
        assert!(err.to_string().contains("USDT/EUR"));
    }

    #[test]
    fn custom_quotes_are_normalized() {
        let prefs = QuotePreference::new(vec![" usdc ".to_string(), "usdt".to_string()]);
        assert_eq!(prefs.quotes(), ["USDC", "USDT"]);
    }
}
