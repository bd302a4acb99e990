//! Binance spot REST adapter.
//!
//! Public endpoints serve markets, prices and daily klines. The taker fee
//! needs a signed account request and is only attempted when API credentials
//! are configured. All calls share one [`Throttle`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::adapters::http::{build_client, decode, request_error};
use crate::adapters::throttle::Throttle;
use crate::domain::error::PipelineError;
use crate::domain::market::TradingPair;
use crate::domain::ohlcv::{date_from_millis, Bar};
use crate::domain::settings::MarketSettings;
use crate::ports::market_port::MarketPort;

type HmacSha256 = Hmac<Sha256>;

struct Credentials {
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    base_asset: String,
    quote_asset: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeFee {
    symbol: String,
    taker_commission: String,
}

pub struct BinanceAdapter {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    throttle: Throttle,
    markets: Mutex<Option<Arc<HashSet<String>>>>,
}

impl BinanceAdapter {
    pub fn new(settings: &MarketSettings) -> Result<Self, PipelineError> {
        let credentials = match (&settings.api_key, &settings.api_secret) {
            (Some(api_key), Some(api_secret)) => Some(Credentials {
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => None,
        };
        Ok(Self {
            client: build_client(settings.timeout, "base_url")?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credentials,
            throttle: Throttle::new(settings.throttle),
            markets: Mutex::new(None),
        })
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PipelineError> {
        self.throttle.wait();
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .map_err(|e| request_error(symbol, e))?;
        decode(symbol, response)
    }

    /// Listed pairs in `BASE/QUOTE` form, fetched once per adapter.
    fn markets(&self, symbol: &str) -> Result<Arc<HashSet<String>>, PipelineError> {
        let mut cached = match self.markets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(markets) = cached.as_ref() {
            return Ok(Arc::clone(markets));
        }

        let info: ExchangeInfo = self.get(symbol, "/api/v3/exchangeInfo", &[])?;
        let markets: HashSet<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| format!("{}/{}", s.base_asset, s.quote_asset))
            .collect();
        tracing::debug!(pairs = markets.len(), "exchange markets loaded");

        let markets = Arc::new(markets);
        *cached = Some(Arc::clone(&markets));
        Ok(markets)
    }
}

/// Hex HMAC-SHA256 of a query string, as Binance expects in `signature`.
pub fn sign(secret: &str, payload: &str) -> Result<String, PipelineError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| PipelineError::ConfigInvalid {
        section: "market".to_string(),
        key: "api_secret".to_string(),
        reason: e.to_string(),
    })?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// `[open_time, open, high, low, close, volume, ...]` → [`Bar`].
pub fn parse_kline(row: &[Value]) -> Option<Bar> {
    let timestamp = row.first()?.as_i64()?;
    Some(Bar {
        timestamp,
        open: number(row.get(1)?)?,
        high: number(row.get(2)?)?,
        low: number(row.get(3)?)?,
        close: number(row.get(4)?)?,
        volume: number(row.get(5)?)?,
        date: date_from_millis(timestamp)?,
    })
}

impl MarketPort for BinanceAdapter {
    fn has_pair(&self, pair: &TradingPair) -> Result<bool, PipelineError> {
        Ok(self.markets(&pair.base)?.contains(&pair.to_string()))
    }

    fn last_price(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError> {
        let ticker: TickerPrice = self.get(
            &pair.base,
            "/api/v3/ticker/price",
            &[("symbol", pair.exchange_symbol())],
        )?;
        Ok(ticker.price.parse().ok())
    }

    fn taker_fee(&self, pair: &TradingPair) -> Result<Option<f64>, PipelineError> {
        let Some(credentials) = &self.credentials else {
            return Err(PipelineError::market(&pair.base, "no API credentials for fee lookup"));
        };

        let query = format!(
            "symbol={}&timestamp={}",
            pair.exchange_symbol(),
            chrono::Utc::now().timestamp_millis()
        );
        let signature = sign(&credentials.api_secret, &query)?;

        self.throttle.wait();
        let response = self
            .client
            .get(format!("{}/sapi/v1/asset/tradeFee?{}&signature={}", self.base_url, query, signature))
            .header("X-MBX-APIKEY", &credentials.api_key)
            .send()
            .map_err(|e| request_error(&pair.base, e))?;
        let fees: Vec<TradeFee> = decode(&pair.base, response)?;

        let wanted = pair.exchange_symbol();
        Ok(fees
            .into_iter()
            .find(|f| f.symbol == wanted)
            .and_then(|f| f.taker_commission.parse().ok()))
    }

    fn daily_bars(&self, pair: &TradingPair, limit: usize) -> Result<Vec<Bar>, PipelineError> {
        let rows: Vec<Vec<Value>> = self.get(
            &pair.base,
            "/api/v3/klines",
            &[
                ("symbol", pair.exchange_symbol()),
                ("interval", "1d".to_string()),
                ("limit", limit.to_string()),
            ],
        )?;

        rows.iter()
            .map(|row| {
                parse_kline(row).ok_or_else(|| {
                    PipelineError::market(&pair.base, format!("malformed kline from {pair}"))
                })
            })
            .collect()
    }
}
