//! Tree-ensemble classifier: bagged CART trees with majority vote
//!
//! Each tree trains on a bootstrap sample with a random feature subset per
//! split. The ensemble exposes impurity-decrease feature importances for
//! the selection stage and vote-share probabilities for ROC scoring.
//! Per-tree generators derive from the configured seed, so fitting is
//! bit-identical whether trees are grown in parallel or serially.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{ChurnClassifier, ModelFamily, TrainError};

/// Ensemble parameters
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Minimum rows on each side of a split
    pub min_leaf: usize,
    /// Features considered per split; defaults to sqrt(feature count)
    pub mtry: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 500,
            max_depth: 12,
            min_leaf: 1,
            mtry: None,
            seed: 21,
        }
    }
}

enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Churn share of the training rows that reached this leaf
        probability: f64,
    },
}

struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { probability } => return *probability,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Fitted bagged forest
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

/// Fit the ensemble on the standardized encoding.
pub fn train(x: &Array2<f64>, y: &[bool], cfg: &ForestConfig) -> Result<RandomForest, TrainError> {
    let family = ModelFamily::Forest;
    let n = y.len();
    let d = x.ncols();

    if cfg.n_trees == 0 {
        return Err(TrainError::NonConvergence {
            family,
            detail: "ensemble needs at least one tree".to_string(),
        });
    }

    let mtry = cfg.mtry.unwrap_or_else(|| (d as f64).sqrt().ceil() as usize).clamp(1, d);

    // One derived seed per tree keeps results independent of scheduling
    let seeds: Vec<u64> = (0..cfg.n_trees)
        .map(|t| cfg.seed ^ (t as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .collect();

    let fitted: Vec<(DecisionTree, Vec<f64>)> = seeds
        .par_iter()
        .map(|&seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            grow_tree(x, y, sample, mtry, cfg, &mut rng)
        })
        .collect();

    let mut trees = Vec::with_capacity(fitted.len());
    let mut importances = vec![0.0; d];
    for (tree, tree_importance) in fitted {
        trees.push(tree);
        for (total, part) in importances.iter_mut().zip(tree_importance.iter()) {
            *total += part;
        }
    }

    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        for value in &mut importances {
            *value /= sum;
        }
    }

    Ok(RandomForest { trees, importances })
}

impl RandomForest {
    /// Normalized mean impurity decrease per matrix column
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

impl ChurnClassifier for RandomForest {
    fn family(&self) -> ModelFamily {
        ModelFamily::Forest
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        Array1::from_iter(x.rows().into_iter().map(|row| {
            let votes = self
                .trees
                .iter()
                .filter(|tree| tree.predict_row(row) >= 0.5)
                .count();
            votes as f64 / self.trees.len() as f64
        }))
    }
}

/// Gini impurity of a node with `pos` churned rows out of `total`
fn gini(pos: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    let p = pos / total;
    2.0 * p * (1.0 - p)
}

fn grow_tree(
    x: &Array2<f64>,
    y: &[bool],
    sample: Vec<usize>,
    mtry: usize,
    cfg: &ForestConfig,
    rng: &mut StdRng,
) -> (DecisionTree, Vec<f64>) {
    let mut builder = TreeBuilder {
        x,
        y,
        mtry,
        max_depth: cfg.max_depth,
        min_leaf: cfg.min_leaf.max(1),
        n_root: sample.len() as f64,
        nodes: Vec::new(),
        importance: vec![0.0; x.ncols()],
    };
    builder.grow(sample, 0, rng);
    (
        DecisionTree {
            nodes: builder.nodes,
        },
        builder.importance,
    )
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a [bool],
    mtry: usize,
    max_depth: usize,
    min_leaf: usize,
    n_root: f64,
    nodes: Vec<TreeNode>,
    importance: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let total = indices.len() as f64;
        let pos = indices.iter().filter(|&&i| self.y[i]).count() as f64;
        let node_gini = gini(pos, total);

        let exhausted = depth >= self.max_depth
            || indices.len() < 2 * self.min_leaf
            || node_gini == 0.0;

        if !exhausted {
            if let Some((gain, feature, threshold)) = self.best_split(&indices, node_gini, rng) {
                self.importance[feature] += (total / self.n_root) * gain;

                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .copied()
                    .partition(|&i| self.x[[i, feature]] <= threshold);

                let node = self.nodes.len();
                self.nodes.push(TreeNode::Leaf { probability: 0.0 }); // placeholder
                let left = self.grow(left_idx, depth + 1, rng);
                let right = self.grow(right_idx, depth + 1, rng);
                self.nodes[node] = TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                };
                return node;
            }
        }

        let node = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            probability: pos / total.max(1.0),
        });
        node
    }

    /// Best (gain, feature, threshold) over a random feature subset, or
    /// `None` when no split improves impurity. Candidate features are
    /// scanned in index order and thresholds ascending, so ties resolve
    /// deterministically.
    fn best_split(
        &self,
        indices: &[usize],
        node_gini: f64,
        rng: &mut StdRng,
    ) -> Option<(f64, usize, f64)> {
        let total = indices.len() as f64;
        let total_pos = indices.iter().filter(|&&i| self.y[i]).count() as f64;

        let mut features = rand::seq::index::sample(rng, self.x.ncols(), self.mtry).into_vec();
        features.sort_unstable();

        let mut best: Option<(f64, usize, f64)> = None;

        for feature in features {
            let mut values: Vec<(f64, bool)> = indices
                .iter()
                .map(|&i| (self.x[[i, feature]], self.y[i]))
                .collect();
            values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_n = 0.0;
            let mut left_pos = 0.0;

            for w in 0..values.len() - 1 {
                left_n += 1.0;
                if values[w].1 {
                    left_pos += 1.0;
                }

                // no threshold between equal values
                if values[w].0 == values[w + 1].0 {
                    continue;
                }
                let right_n = total - left_n;
                if left_n < self.min_leaf as f64 || right_n < self.min_leaf as f64 {
                    continue;
                }

                let right_pos = total_pos - left_pos;
                let weighted = (left_n / total) * gini(left_pos, left_n)
                    + (right_n / total) * gini(right_pos, right_n);
                let gain = node_gini - weighted;

                if gain > 1e-12 && best.map_or(true, |(g, _, _)| gain > g) {
                    let threshold = (values[w].0 + values[w + 1].0) / 2.0;
                    best = Some((gain, feature, threshold));
                }
            }
        }

        best
    }
}
