//! Classifier capability and the random-forest model family
//!
//! Training code treats a fitted model as an opaque object that can:
//! - predict a class for one feature vector
//! - return per-class probabilities in class-index order
//! - report the hyperparameters it was built with

pub mod decision_tree;
pub mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForestClassifier};

use crate::error::Result;
use ndarray::{Array1, ArrayView1};
use std::fmt::Debug;

/// Capability interface of a fitted classifier
pub trait Classifier: Send + Sync + Debug {
    /// Model family name, e.g. `RandomForestClassifier`
    fn model_type(&self) -> &'static str;

    /// Expected input dimensionality
    fn n_features(&self) -> usize;

    /// Class labels, in the order used by [`Classifier::predict_proba_one`]
    fn classes(&self) -> &[usize];

    fn n_classes(&self) -> usize {
        self.classes().len()
    }

    /// Per-class probabilities for a single sample
    fn predict_proba_one(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>>;

    /// Predicted class for a single sample (first argmax of the probabilities)
    fn predict_one(&self, sample: ArrayView1<'_, f64>) -> Result<usize> {
        let proba = self.predict_proba_one(sample)?;
        Ok(self.classes()[argmax(proba.view())])
    }

    /// Hyperparameter lookup; `None` when the model has no such attribute
    fn hyperparameter(&self, _name: &str) -> Option<serde_json::Value> {
        None
    }
}

/// Index of the first maximum; 0 for an empty view
pub fn argmax(values: ArrayView1<'_, f64>) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best {
            best = v;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(array![0.1, 0.4, 0.4, 0.1].view()), 1);
        assert_eq!(argmax(array![0.9].view()), 0);
        assert_eq!(argmax(Array1::<f64>::zeros(0).view()), 0);
    }
}
