//! Random Forest classifier

use super::decision_tree::{Criterion, DecisionTree};
use super::Classifier;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features examined per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    /// Number of features seen during fit
    n_features: usize,
    /// Sorted class labels seen during fit
    classes: Vec<usize>,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestClassifier {
    pub const MODEL_TYPE: &'static str = "RandomForestClassifier";

    /// Create a new classifier forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth (`None` grows trees until leaves are pure)
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
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

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    fn validate(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::InvalidParameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(PipelineError::Data(format!(
                "cannot fit on an empty matrix ({} x {})",
                x.nrows(),
                x.ncols()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Data("features contain NaN or infinite values".to_string()));
        }
        Ok(())
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<&mut Self> {
        self.validate(x, y)?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let max_features = self.compute_max_features(n_features);

        let mut classes: Vec<usize> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        // Trees see class indices, not raw labels
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();
        let n_classes = classes.len();

        let base_seed = self.random_state.unwrap_or(42);

        // Each tree owns a seed derived from its index, so parallel fitting stays reproducible
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_criterion(self.criterion);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit_indices(x, &encoded, &sample_indices, n_classes, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = n_features;
        self.classes = classes;
        Ok(self)
    }

    fn check_sample(&self, sample: &ArrayView1<'_, f64>) -> Result<()> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        if sample.len() != self.n_features {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", sample.len()),
            });
        }
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Data("features contain NaN or infinite values".to_string()));
        }
        Ok(())
    }

    /// Mean of the leaf distributions across all trees
    fn soft_vote(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.check_sample(&sample)?;

        let mut proba = Array1::<f64>::zeros(self.classes.len());
        for tree in &self.trees {
            let dist = tree.predict_distribution(sample)?;
            proba += &ArrayView1::from(dist);
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    /// Predict class labels for every row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let labels = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict_one(x.row(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Array1::from_vec(labels))
    }

    /// Predict class probabilities for every row, columns ordered like [`Classifier::classes`]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            proba.row_mut(i).assign(&self.soft_vote(row)?);
        }
        Ok(proba)
    }

    /// Fraction of rows whose predicted label equals the true label
    pub fn score(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<f64> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if y.is_empty() {
            return Err(PipelineError::Data("cannot score on zero samples".to_string()));
        }
        let predictions = self.predict(x)?;
        let correct = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Serialize the fitted forest
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        Ok(serde_json::to_vec(self)?)
    }

    /// Load a forest previously written with [`RandomForestClassifier::to_json_bytes`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let model: Self = serde_json::from_slice(&bytes)?;
        if model.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        Ok(model)
    }
}

impl Classifier for RandomForestClassifier {
    fn model_type(&self) -> &'static str {
        Self::MODEL_TYPE
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba_one(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.soft_vote(sample)
    }

    fn hyperparameter(&self, name: &str) -> Option<serde_json::Value> {
        use serde_json::json;
        match name {
            "n_estimators" => Some(json!(self.n_estimators)),
            "max_depth" => Some(json!(self.max_depth)),
            "min_samples_split" => Some(json!(self.min_samples_split)),
            "min_samples_leaf" => Some(json!(self.min_samples_leaf)),
            "bootstrap" => Some(json!(self.bootstrap)),
            "criterion" => Some(json!(self.criterion.as_str())),
            "random_state" => Some(json!(self.random_state)),
            "n_features" => Some(json!(self.n_features)),
            _ => None,
        }
    }
}
