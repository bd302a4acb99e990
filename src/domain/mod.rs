//! Core domain types and logic.

pub mod batch;
pub mod config_validation;
pub mod date_format;
pub mod error;
pub mod features;
pub mod indicator;
pub mod inference;
pub mod label;
pub mod market;
pub mod metrics;
pub mod model;
pub mod ohlcv;
pub mod pipeline;
pub mod settings;
pub mod simulation;
pub mod universe;
pub mod walk_forward;
