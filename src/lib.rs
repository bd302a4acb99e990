//! coinsignal: daily buy-signal pipeline for crypto assets.
//!
//! Bars become indicator features, features are labeled by forward return,
//! a random forest is walk-forward trained per symbol and the latest row is
//! scored. Buy signals can then be paper-purchased and marked to market.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
