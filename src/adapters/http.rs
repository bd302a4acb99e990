//! Shared blocking HTTP plumbing for the market adapters.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::domain::error::PipelineError;

const USER_AGENT: &str = concat!("coinsignal/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration, key: &str) -> Result<Client, PipelineError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PipelineError::ConfigInvalid {
            section: "market".to_string(),
            key: key.to_string(),
            reason: format!("cannot build HTTP client: {e}"),
        })
}

/// Every transport, status and decode failure is a market lookup failure for
/// `symbol`; timeouts are called out explicitly.
pub fn request_error(symbol: &str, err: reqwest::Error) -> PipelineError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if let Some(status) = err.status() {
        format!("exchange answered {status}")
    } else if err.is_decode() {
        format!("unexpected response body: {err}")
    } else {
        err.to_string()
    };
    PipelineError::market(symbol, reason)
}

pub fn decode<T: DeserializeOwned>(symbol: &str, response: Response) -> Result<T, PipelineError> {
    response
        .error_for_status()
        .map_err(|e| request_error(symbol, e))?
        .json::<T>()
        .map_err(|e| request_error(symbol, e))
}
