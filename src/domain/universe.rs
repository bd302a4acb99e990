//! Symbol universe: the ranked asset list and ticker validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::batch::SkippedSymbol;
use crate::domain::error::PipelineError;

pub const MIN_SYMBOL_LEN: usize = 2;
pub const MAX_SYMBOL_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAsset {
    pub rank: Option<u32>,
    pub symbol: String,
    pub name: String,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
}

/// Upper-cases a ticker and checks it is 2-10 ASCII alphanumerics.
pub fn normalize_symbol(raw: &str) -> Result<String, UniverseError> {
    let symbol = raw.trim().to_uppercase();
    let valid_len = (MIN_SYMBOL_LEN..=MAX_SYMBOL_LEN).contains(&symbol.len());
    if !valid_len || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(UniverseError::InvalidSymbol(raw.trim().to_string()));
    }
    Ok(symbol)
}

/// Normalizes fetched assets. Invalid tickers and repeats are skipped, the
/// first occurrence wins, and ranking order is preserved.
pub fn normalize_universe(assets: Vec<RankedAsset>) -> (Vec<RankedAsset>, Vec<SkippedSymbol>) {
    let mut kept = Vec::with_capacity(assets.len());
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for mut asset in assets {
        match normalize_symbol(&asset.symbol) {
            Ok(symbol) if seen.insert(symbol.clone()) => {
                asset.symbol = symbol;
                kept.push(asset);
            }
            Ok(symbol) => skipped.push(SkippedSymbol::new(
                &symbol,
                PipelineError::data_shape(&symbol, "duplicate ticker in ranking"),
            )),
            Err(e) => skipped.push(SkippedSymbol::new(
                &asset.symbol,
                PipelineError::data_shape(&asset.symbol, e.to_string()),
            )),
        }
    }

    (kept, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(rank: u32, symbol: &str) -> RankedAsset {
        RankedAsset {
            rank: Some(rank),
            symbol: symbol.to_string(),
            name: symbol.to_lowercase(),
            market_cap: Some(1e9 / rank as f64),
        }
    }

    #[test]
    fn test_normalize_symbol_bounds() {
        assert!(normalize_symbol("X").is_err());
        assert!(normalize_symbol("ABCDEFGHIJK").is_err());
        assert!(normalize_symbol("USD-T").is_err());
        assert_eq!(normalize_symbol("ab12").unwrap(), "AB12");
    }

    #[test]
    fn test_normalize_universe_skips_bad_tickers() {
        let (kept, skipped) = normalize_universe(vec![
            asset(1, "btc"),
            asset(2, "e$h"),
            asset(3, "sol"),
            asset(4, "BTC"),
        ]);
        let symbols: Vec<_> = kept.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "SOL"]);
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].symbol, "e$h");
        assert_eq!(skipped[1].symbol, "BTC");
    }
}
