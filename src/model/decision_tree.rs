//! Decision tree implementation (CART classification)

use crate::error::{PipelineError, Result};
use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the class distribution of its training samples
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
        }
    }

    fn impurity(&self, counts: &[usize], n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// Best split found for a node
struct SplitChoice {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree classifier over class indices `0..n_classes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Non-constant features to examine per split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Number of features
    n_features: usize,
    /// Number of classes
    n_classes: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new unfitted tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of features examined per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Fit on every row of `x`, drawing feature order from `seed`
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize, seed: u64) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.fit_indices(x, y, &indices, n_classes, &mut rng)
    }

    /// Fit on the rows named by `indices` (duplicates allowed, as in a bootstrap sample)
    pub fn fit_indices(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        n_classes: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if indices.is_empty() {
            return Err(PipelineError::Data("cannot fit a tree on zero samples".to_string()));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(PipelineError::Data(format!(
                "class index {} out of range for {} classes",
                bad, n_classes
            )));
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::InvalidParameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;
        self.root = Some(self.build_tree(x, y, indices, 0, rng));
        Ok(self)
    }

    fn class_counts(&self, y: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        let n = n_samples.max(1) as f64;
        TreeNode::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / n).collect(),
            n_samples,
        }
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let impurity = self.criterion.impurity(&counts, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= f64::EPSILON;

        if should_stop {
            return self.leaf(&counts, n_samples);
        }

        let Some(split) = self.find_best_split(x, y, indices, &counts, impurity, rng) else {
            return self.leaf(&counts, n_samples);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Scan features in a random order until `max_features` non-constant ones have
    /// been examined, keeping the first split with the highest gain.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        parent_counts: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitChoice> {
        let n_features = x.ncols();
        let max_features = self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));
        let n = indices.len();

        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let mut best: Option<SplitChoice> = None;
        let mut visited = 0usize;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature_idx in features {
            if visited >= max_features {
                break;
            }

            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (x[[i, feature_idx]], y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            if pairs[0].0 >= pairs[n - 1].0 {
                // Constant within this node; does not count towards max_features
                continue;
            }
            visited += 1;

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.to_vec();

            for k in 0..n - 1 {
                let (value, label) = pairs[k];
                left_counts[label] += 1;
                right_counts[label] -= 1;

                let next = pairs[k + 1].0;
                if next <= value {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * self.criterion.impurity(&left_counts, n_left)
                    + n_right as f64 * self.criterion.impurity(&right_counts, n_right))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitChoice {
                        feature_idx,
                        threshold: split_threshold(value, next),
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Class distribution of the leaf reached by `sample`
    pub fn predict_distribution(&self, sample: ArrayView1<'_, f64>) -> Result<&[f64]> {
        let mut node = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if sample.len() != self.n_features {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", sample.len()),
            });
        }

        loop {
            match node {
                TreeNode::Leaf { distribution, .. } => return Ok(distribution),
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Most probable class index for each row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        x.rows()
            .into_iter()
            .map(|row| {
                self.predict_distribution(row)
                    .map(|dist| super::argmax(ArrayView1::from(dist)))
            })
            .collect()
    }

    /// Number of split levels (a single leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

/// Midpoint between two consecutive distinct values.
///
/// Rounding can push the midpoint of adjacent floats onto `next`, which would
/// send every row left under `<=`; `value` is used instead in that case.
fn split_threshold(value: f64, next: f64) -> f64 {
    let mid = value + (next - value) / 2.0;
    if mid < next {
        mid
    } else {
        value
    }
}
