//! Configuration validation.
//!
//! Checks value ranges before any stage runs. Absent keys are fine: they fall
//! back to their defaults when the settings are built.

use crate::domain::error::PipelineError;
use crate::ports::config_port::ConfigPort;

pub fn validate_pipeline_config(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    validate_market(config)?;
    validate_model(config)?;
    validate_simulation(config)?;
    validate_network_fees(config)?;
    validate_workers(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> PipelineError {
    PipelineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    if config.get_int("market", "top_n", 50) <= 0 {
        return Err(invalid("market", "top_n", "top_n must be positive"));
    }
    if config.get_int("market", "timeout_secs", 10) <= 0 {
        return Err(invalid("market", "timeout_secs", "timeout_secs must be positive"));
    }
    if config.get_int("market", "throttle_ms", 1200) < 0 {
        return Err(invalid("market", "throttle_ms", "throttle_ms must be non-negative"));
    }
    if config.get_int("market", "ohlcv_limit", 1000) <= 0 {
        return Err(invalid("market", "ohlcv_limit", "ohlcv_limit must be positive"));
    }
    if let Some(quotes) = config.get_string("market", "quote_currencies") {
        if quotes.split(',').all(|q| q.trim().is_empty()) {
            return Err(invalid(
                "market",
                "quote_currencies",
                "quote_currencies must name at least one currency",
            ));
        }
    }
    for key in ["base_url", "ranking_url"] {
        if let Some(url) = config.get_string("market", key) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(invalid("market", key, "URL must start with http:// or https://"));
            }
        }
    }
    Ok(())
}

fn validate_model(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    if config.get_int("model", "n_estimators", 100) <= 0 {
        return Err(invalid("model", "n_estimators", "n_estimators must be positive"));
    }
    if config.get_int("model", "max_depth", 0) < 0 {
        return Err(invalid("model", "max_depth", "max_depth must be non-negative (0 = unlimited)"));
    }
    if config.get_int("model", "min_samples_split", 2) < 2 {
        return Err(invalid("model", "min_samples_split", "min_samples_split must be at least 2"));
    }
    if config.get_int("model", "min_samples_leaf", 1) < 1 {
        return Err(invalid("model", "min_samples_leaf", "min_samples_leaf must be at least 1"));
    }
    if config.get_int("model", "seed", 42) < 0 {
        return Err(invalid("model", "seed", "seed must be non-negative"));
    }
    Ok(())
}

fn validate_simulation(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    let investment = config.get_double("simulation", "investment", 1000.0);
    if !(investment > 0.0) || !investment.is_finite() {
        return Err(invalid("simulation", "investment", "investment must be positive"));
    }
    let taker = config.get_double("simulation", "default_taker_fee", 0.001);
    if !(0.0..1.0).contains(&taker) {
        return Err(invalid(
            "simulation",
            "default_taker_fee",
            "default_taker_fee must be in [0, 1)",
        ));
    }
    if config.get_double("simulation", "default_network_fee", 2.0) < 0.0 {
        return Err(invalid(
            "simulation",
            "default_network_fee",
            "default_network_fee must be non-negative",
        ));
    }
    if let Some(currency) = config.get_string("simulation", "local_currency") {
        let currency = currency.trim();
        let well_formed = (2..=10).contains(&currency.len())
            && currency.chars().all(|c| c.is_ascii_alphanumeric());
        if !currency.is_empty() && !well_formed {
            return Err(invalid(
                "simulation",
                "local_currency",
                "local_currency must be 2-10 letters or digits",
            ));
        }
    }
    Ok(())
}

fn validate_network_fees(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    for key in config.section_keys("network_fees") {
        let fee = config.get_double("network_fees", &key, f64::NAN);
        if !(fee >= 0.0) {
            return Err(invalid(
                "network_fees",
                &key,
                "network fee must be a non-negative number",
            ));
        }
    }
    Ok(())
}

fn validate_workers(config: &dyn ConfigPort) -> Result<(), PipelineError> {
    if config.get_int("pipeline", "workers", 0) < 0 {
        return Err(invalid("pipeline", "workers", "workers must be non-negative (0 = one per core)"));
    }
    Ok(())
}
