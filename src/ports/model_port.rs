//! Model artifact storage port.

use crate::domain::error::PipelineError;
use crate::domain::model::Model;

/// One model per symbol; saving overwrites.
pub trait ModelPort: Send + Sync {
    fn save(&self, model: &Model) -> Result<(), PipelineError>;

    /// `ArtifactNotFound` when no model was ever saved for `symbol`.
    fn load(&self, symbol: &str) -> Result<Model, PipelineError>;
}
