//! On-disk layout of the data directory.
//!
//! ```text
//! <dir>/top50.csv
//! <dir>/ohlcv/SYMBOL.csv
//! <dir>/features/SYMBOL_feat.csv
//! <dir>/labels/SYMBOL_label.csv
//! <dir>/models/SYMBOL_model.json
//! <dir>/reports/SYMBOL_folds.csv
//! <dir>/buy_signals.json
//! <dir>/simulations/purchase_YYYY-MM-DD.csv
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::error::{Artifact, PipelineError};

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn universe(&self) -> PathBuf {
        self.root.join("top50.csv")
    }

    pub fn signals(&self) -> PathBuf {
        self.root.join("buy_signals.json")
    }

    pub fn fold_reports(&self, symbol: &str) -> PathBuf {
        self.root.join("reports").join(format!("{symbol}_folds.csv"))
    }

    pub fn simulation(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join("simulations")
            .join(format!("purchase_{}.csv", date.format("%Y-%m-%d")))
    }

    /// Directory and file-name suffix of per-symbol tables.
    fn per_symbol(&self, artifact: Artifact) -> Option<(PathBuf, &'static str)> {
        let (dir, suffix) = match artifact {
            Artifact::Ohlcv => ("ohlcv", ".csv"),
            Artifact::Features => ("features", "_feat.csv"),
            Artifact::Labels => ("labels", "_label.csv"),
            Artifact::Model => ("models", "_model.json"),
            Artifact::Universe | Artifact::Signals | Artifact::Simulation => return None,
        };
        Some((self.root.join(dir), suffix))
    }

    pub fn symbol_path(&self, artifact: Artifact, symbol: &str) -> Option<PathBuf> {
        self.per_symbol(artifact)
            .map(|(dir, suffix)| dir.join(format!("{symbol}{suffix}")))
    }

    /// Symbols with a stored file of the given kind, sorted. A missing
    /// directory means no symbols.
    pub fn list_symbols(&self, artifact: Artifact) -> Result<Vec<String>, PipelineError> {
        let Some((dir, suffix)) = self.per_symbol(artifact) else {
            return Ok(Vec::new());
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| storage_error(&dir, e))?;
        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| storage_error(&dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(symbol) = name.strip_suffix(suffix) {
                if !symbol.is_empty() && !symbol.contains('_') {
                    symbols.push(symbol.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

/// `purchase_2024-05-01.csv` → `purchase_2024-05-01_eval.csv`, in the same directory.
pub fn evaluation_path(simulation: &Path) -> PathBuf {
    let stem = simulation
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "simulation".to_string());
    simulation.with_file_name(format!("{stem}_eval.csv"))
}

pub fn storage_error(path: &Path, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Storage {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

pub fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| storage_error(parent, e))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_follow_layout() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.symbol_path(Artifact::Features, "BTC").unwrap(),
            PathBuf::from("/data/features/BTC_feat.csv")
        );
        assert_eq!(
            layout.symbol_path(Artifact::Model, "ETH").unwrap(),
            PathBuf::from("/data/models/ETH_model.json")
        );
        assert_eq!(
            layout.simulation(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            PathBuf::from("/data/simulations/purchase_2024-05-01.csv")
        );
        assert!(layout.symbol_path(Artifact::Signals, "BTC").is_none());
    }

    #[test]
    fn evaluation_path_sits_beside_input() {
        assert_eq!(
            evaluation_path(Path::new("/data/simulations/purchase_2024-05-01.csv")),
            PathBuf::from("/data/simulations/purchase_2024-05-01_eval.csv")
        );
    }

    #[test]
    fn list_symbols_filters_by_suffix() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let dir = tmp.path().join("features");
        fs::create_dir_all(&dir).unwrap();
        for name in ["SOL_feat.csv", "BTC_feat.csv", "notes.txt", "ETH_label.csv"] {
            fs::write(dir.join(name), "").unwrap();
        }
        assert_eq!(layout.list_symbols(Artifact::Features).unwrap(), vec!["BTC", "SOL"]);
    }

    #[test]
    fn list_symbols_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        assert!(layout.list_symbols(Artifact::Ohlcv).unwrap().is_empty());
    }
}
