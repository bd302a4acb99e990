//! Market-cap ranking from the CoinGecko `coins/markets` endpoint.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::adapters::http::{build_client, decode, request_error};
use crate::adapters::throttle::Throttle;
use crate::domain::error::PipelineError;
use crate::domain::settings::MarketSettings;
use crate::domain::universe::RankedAsset;
use crate::ports::market_port::RankingPort;

const RANKING: &str = "ranking";

#[derive(Debug, Deserialize)]
struct CoinMarket {
    symbol: String,
    #[serde(default)]
    name: String,
    market_cap_rank: Option<u32>,
    market_cap: Option<f64>,
}

impl From<CoinMarket> for RankedAsset {
    fn from(coin: CoinMarket) -> Self {
        RankedAsset {
            rank: coin.market_cap_rank,
            symbol: coin.symbol.trim().to_uppercase(),
            name: coin.name,
            market_cap: coin.market_cap,
        }
    }
}

pub struct CoinGeckoAdapter {
    client: Client,
    base_url: String,
    throttle: Throttle,
}

impl CoinGeckoAdapter {
    pub fn new(settings: &MarketSettings) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_client(settings.timeout, "ranking_url")?,
            base_url: settings.ranking_url.trim_end_matches('/').to_string(),
            throttle: Throttle::new(settings.throttle),
        })
    }
}

impl RankingPort for CoinGeckoAdapter {
    fn top_assets(&self, vs_currency: &str, count: usize) -> Result<Vec<RankedAsset>, PipelineError> {
        self.throttle.wait();
        let response = self
            .client
            .get(format!("{}/coins/markets", self.base_url))
            .query(&[
                ("vs_currency", vs_currency.to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", count.to_string()),
                ("page", "1".to_string()),
                ("sparkline", "false".to_string()),
            ])
            .send()
            .map_err(|e| request_error(RANKING, e))?;
        let coins: Vec<CoinMarket> = decode(RANKING, response)?;
        tracing::debug!(coins = coins.len(), vs_currency, "ranking received");

        Ok(coins.into_iter().take(count).map(RankedAsset::from).collect())
    }
}
