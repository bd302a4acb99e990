//! CART classification tree with Gini impurity.
//!
//! Nodes live in a flat arena; index 0 is the root. A sample goes left when
//! `x[feature] <= threshold` or the value is NaN.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        /// Fraction of positive samples that reached this leaf.
        positive: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split.
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl DecisionTree {
    /// Grows a tree on the rows named by `indices` (duplicates allowed, as in
    /// a bootstrap sample). `indices` must not be empty.
    pub fn fit<R: Rng>(data: &Dataset, indices: Vec<usize>, params: &TreeParams, rng: &mut R) -> Self {
        let mut tree = DecisionTree { nodes: Vec::new() };
        if indices.is_empty() {
            tree.nodes.push(Node::Leaf {
                positive: 0.0,
                samples: 0,
            });
            return tree;
        }
        tree.grow(data, indices, 0, params, rng);
        tree
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes.get(id) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Positive-class probability for one sample.
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { positive, .. }) => return *positive,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x.get(*feature).copied().unwrap_or(f64::NAN);
                    id = if v > *threshold { *right } else { *left };
                }
                None => return 0.0,
            }
        }
    }

    /// Checks arena links after deserialization.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!("node {i} splits on unknown feature {feature}"));
                }
                // Children are always pushed after their parent.
                if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(format!("node {i} has invalid children {left}/{right}"));
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn grow<R: Rng>(
        &mut self,
        data: &Dataset,
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        rng: &mut R,
    ) -> usize {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| data.labels[i] == 1).count();
        let leaf = Node::Leaf {
            positive: positives as f64 / n as f64,
            samples: n,
        };

        let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || n < params.min_samples_split || positives == 0 || positives == n {
            return self.push(leaf);
        }

        let Some(split) = best_split(data, &indices, positives, params, rng) else {
            return self.push(leaf);
        };

        let id = self.push(leaf);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| !(data.features[i][split.feature] > split.threshold));

        let left = self.grow(data, left_rows, depth + 1, params, rng);
        let right = self.grow(data, right_rows, depth + 1, params, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Best threshold over a random subset of features. Each feature is scanned
/// once after sorting, so the search is O(n log n) per feature.
fn best_split<R: Rng>(
    data: &Dataset,
    indices: &[usize],
    positives: usize,
    params: &TreeParams,
    rng: &mut R,
) -> Option<SplitCandidate> {
    let n = indices.len();
    let parent = gini(positives, n);

    let mut candidates: Vec<usize> = (0..data.width()).collect();
    candidates.shuffle(rng);
    candidates.truncate(params.max_features.clamp(1, data.width().max(1)));

    let mut best: Option<SplitCandidate> = None;
    let mut column: Vec<(f64, u8)> = Vec::with_capacity(n);

    for feature in candidates {
        column.clear();
        column.extend(indices.iter().map(|&i| (data.features[i][feature], data.labels[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_pos = 0usize;
        for k in 0..n - 1 {
            left_pos += usize::from(column[k].1 == 1);
            let left_n = k + 1;
            let right_n = n - left_n;
            if column[k].0 == column[k + 1].0 {
                continue;
            }
            if left_n < params.min_samples_leaf || right_n < params.min_samples_leaf {
                continue;
            }

            let weighted = (left_n as f64 * gini(left_pos, left_n)
                + right_n as f64 * gini(positives - left_pos, right_n))
                / n as f64;
            let gain = parent - weighted;
            if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (column[k].0 + column[k + 1].0) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
