//! Domain error types.
//!
//! Per-symbol failures (bad table shape, short history, missing artifact, market
//! lookup) are recoverable: batch stages turn them into skip entries. Everything
//! else aborts the run.

use std::fmt;

/// Kind of persisted artifact a stage expected to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Universe,
    Ohlcv,
    Features,
    Labels,
    Model,
    Signals,
    Simulation,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Universe => "universe table",
            Artifact::Ohlcv => "ohlcv table",
            Artifact::Features => "feature table",
            Artifact::Labels => "label table",
            Artifact::Model => "model",
            Artifact::Signals => "buy signal list",
            Artifact::Simulation => "simulation record set",
        };
        f.write_str(name)
    }
}

/// Top-level error type for coinsignal.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("data shape error for {symbol}: {reason}")]
    DataShape { symbol: String, reason: String },

    #[error("insufficient history for {symbol}: have {rows} rows, need {minimum}")]
    InsufficientHistory {
        symbol: String,
        rows: usize,
        minimum: usize,
    },

    #[error("{artifact} not found for {symbol}")]
    ArtifactNotFound { symbol: String, artifact: Artifact },

    #[error("no feature rows for {symbol}")]
    NoData { symbol: String },

    #[error("market lookup failed for {symbol}: {reason}")]
    MarketLookup { symbol: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn data_shape(symbol: &str, reason: impl Into<String>) -> Self {
        PipelineError::DataShape {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(symbol: &str, artifact: Artifact) -> Self {
        PipelineError::ArtifactNotFound {
            symbol: symbol.to_string(),
            artifact,
        }
    }

    pub fn market(symbol: &str, reason: impl Into<String>) -> Self {
        PipelineError::MarketLookup {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the failure only concerns one symbol and the batch may continue.
    pub fn is_symbol_level(&self) -> bool {
        matches!(
            self,
            PipelineError::DataShape { .. }
                | PipelineError::InsufficientHistory { .. }
                | PipelineError::ArtifactNotFound { .. }
                | PipelineError::NoData { .. }
                | PipelineError::MarketLookup { .. }
        )
    }
}

impl From<&PipelineError> for std::process::ExitCode {
    fn from(err: &PipelineError) -> Self {
        let code: u8 = match err {
            PipelineError::Io(_) | PipelineError::Storage { .. } => 1,
            PipelineError::ConfigParse { .. }
            | PipelineError::ConfigMissing { .. }
            | PipelineError::ConfigInvalid { .. } => 2,
            PipelineError::DataShape { .. }
            | PipelineError::InsufficientHistory { .. }
            | PipelineError::ArtifactNotFound { .. }
            | PipelineError::NoData { .. } => 5,
            PipelineError::MarketLookup { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
