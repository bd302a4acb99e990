//! Concrete adapter implementations for ports.

pub mod binance_adapter;
pub mod coingecko_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod http;
pub mod layout;
pub mod model_store;
pub mod throttle;
