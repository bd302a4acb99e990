//! Bagged random forest over [`DecisionTree`]s.
//!
//! Tree `i` draws its bootstrap sample and feature subsets from a ChaCha8
//! stream seeded with `seed + i`, so a fit is reproducible regardless of how
//! rayon schedules the trees.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeParams};
use super::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` means ceil(sqrt(width)).
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    fn tree_params(&self, width: usize) -> TreeParams {
        let sqrt = (width as f64).sqrt().ceil() as usize;
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf.max(1),
            max_features: self.max_features.unwrap_or(sqrt).max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits `config.n_estimators` trees. An empty dataset yields a forest
    /// that predicts probability 0 everywhere.
    pub fn fit(data: &Dataset, config: &ForestConfig) -> Self {
        let n = data.len();
        if n == 0 {
            return Self {
                n_features: data.width(),
                trees: Vec::new(),
            };
        }

        let params = config.tree_params(data.width());
        let trees = (0..config.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
                let sample: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(data, sample, &params, &mut rng)
            })
            .collect();

        Self {
            n_features: data.width(),
            trees,
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the per-tree positive probabilities (soft voting).
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_proba(x)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &[f64]) -> u8 {
        u8::from(self.predict_proba(x) > 0.5)
    }

    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        rows.iter().map(|x| self.predict(x)).collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(i, t)| t.validate(self.n_features).map_err(|e| format!("tree {i}: {e}")))
    }
}
