//! Model persistence as one JSON file per symbol.

use std::fs;
use std::path::PathBuf;

use crate::adapters::layout::{ensure_parent, storage_error, DataLayout};
use crate::domain::error::{Artifact, PipelineError};
use crate::domain::model::Model;
use crate::ports::model_port::ModelPort;

pub struct JsonModelStore {
    layout: DataLayout,
}

impl JsonModelStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            layout: DataLayout::new(base_path),
        }
    }

    fn path(&self, symbol: &str) -> Result<PathBuf, PipelineError> {
        self.layout
            .symbol_path(Artifact::Model, symbol)
            .ok_or_else(|| PipelineError::not_found(symbol, Artifact::Model))
    }
}

impl ModelPort for JsonModelStore {
    fn save(&self, model: &Model) -> Result<(), PipelineError> {
        let path = self.path(&model.symbol)?;
        ensure_parent(&path)?;
        let bytes = model.to_json()?;
        // Write then rename so a reader never sees a half-written model.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| storage_error(&path, e))
    }

    fn load(&self, symbol: &str) -> Result<Model, PipelineError> {
        let path = self.path(symbol)?;
        if !path.is_file() {
            return Err(PipelineError::not_found(symbol, Artifact::Model));
        }
        let bytes = fs::read(&path).map_err(|e| storage_error(&path, e))?;
        Model::from_json(symbol, &bytes)
    }
}
