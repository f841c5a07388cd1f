//! Candidate trainer
//!
//! One shuffled train/test partition is drawn per run and shared by every
//! candidate, so their accuracies are comparable.

use super::candidate::CandidateConfig;
use crate::config::{DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::error::{PipelineError, Result};
use crate::model::RandomForestClassifier;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info};

/// Held-out partition of a dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<usize>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<usize>,
}

impl TrainTestSplit {
    /// Shuffle row indices with `seed` and hold out `ceil(n * test_fraction)` rows
    pub fn new(x: &Array2<f64>, y: &Array1<usize>, test_fraction: f64, seed: u64) -> Result<Self> {
        let n = x.nrows();
        if n != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} labels", n),
                actual: format!("{} labels", y.len()),
            });
        }
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(PipelineError::InvalidSplit(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }

        let n_test = (n as f64 * test_fraction).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(PipelineError::InvalidSplit(format!(
                "{} samples with test fraction {} leaves {} train / {} test rows",
                n, test_fraction, n_train, n_test
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok(Self {
            x_train: x.select(Axis(0), train_idx),
            y_train: y.select(Axis(0), train_idx),
            x_test: x.select(Axis(0), test_idx),
            y_test: y.select(Axis(0), test_idx),
        })
    }

    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }
}

/// A fitted and scored candidate
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub config: CandidateConfig,
    pub model: RandomForestClassifier,
    pub accuracy: f64,
}

/// Fits one forest per candidate on a shared split
#[derive(Debug, Clone)]
pub struct CandidateTrainer {
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for CandidateTrainer {
    fn default() -> Self {
        Self::new(DEFAULT_TEST_FRACTION, DEFAULT_SEED)
    }
}

impl CandidateTrainer {
    pub fn new(test_fraction: f64, split_seed: u64) -> Self {
        Self { test_fraction, split_seed }
    }

    pub fn split(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<TrainTestSplit> {
        let split = TrainTestSplit::new(x, y, self.test_fraction, self.split_seed)?;
        debug!(
            train = split.n_train(),
            test = split.n_test(),
            seed = self.split_seed,
            "Dataset split"
        );
        Ok(split)
    }

    /// Fit and score a single candidate. Any failure names the candidate.
    pub fn fit_candidate(&self, config: &CandidateConfig, split: &TrainTestSplit) -> Result<CandidateResult> {
        let fail = |err: PipelineError| PipelineError::TrainingFailure {
            candidate: config.name.clone(),
            reason: err.to_string(),
        };

        let start = Instant::now();
        let mut model = config.params.build_model();
        model.fit(&split.x_train, &split.y_train).map_err(fail)?;
        let accuracy = model.score(&split.x_test, &split.y_test).map_err(fail)?;

        info!(
            candidate = %config.name,
            n_estimators = config.params.n_estimators,
            max_depth = ?config.params.max_depth,
            accuracy,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Candidate trained"
        );

        Ok(CandidateResult {
            config: config.clone(),
            model,
            accuracy,
        })
    }

    /// Split once, then fit every candidate in order; the first failure aborts
    pub fn train(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        configs: &[CandidateConfig],
    ) -> Result<(TrainTestSplit, Vec<CandidateResult>)> {
        let split = self.split(x, y)?;
        let results = configs
            .iter()
            .map(|config| self.fit_candidate(config, &split))
            .collect::<Result<Vec<_>>>()?;
        Ok((split, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Hyperparameters;
    use ndarray::array;

    fn toy() -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| (i % 2) as f64 * 5.0 + j as f64 + i as f64 * 0.01);
        let y = Array1::from_shape_fn(40, |i| i % 2);
        (x, y)
    }

    #[test]
    fn test_split_sizes_use_ceil() {
        let x = Array2::<f64>::zeros((1797, 3));
        let y = Array1::<usize>::zeros(1797);
        let split = TrainTestSplit::new(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.n_test(), 360);
        assert_eq!(split.n_train(), 1437);
    }

    #[test]
    fn test_split_is_a_permutation() {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(10, |i| i);
        let split = TrainTestSplit::new(&x, &y, 0.3, 7).unwrap();

        let mut seen: Vec<usize> = split.y_train.iter().chain(split.y_test.iter()).copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        // rows stay aligned with their labels
        for (row, label) in split.x_test.axis_iter(Axis(0)).zip(split.y_test.iter()) {
            assert_eq!(row[0] as usize, *label);
        }
    }

    #[test]
    fn test_split_deterministic() {
        let (x, y) = toy();
        let a = TrainTestSplit::new(&x, &y, 0.2, 42).unwrap();
        let b = TrainTestSplit::new(&x, &y, 0.2, 42).unwrap();
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.x_train, b.x_train);
    }

    #[test]
    fn test_invalid_fraction() {
        let (x, y) = toy();
        assert!(matches!(
            TrainTestSplit::new(&x, &y, 1.0, 42),
            Err(PipelineError::InvalidSplit(_))
        ));
        let x1 = array![[1.0]];
        let y1 = array![0];
        assert!(TrainTestSplit::new(&x1, &y1, 0.2, 42).is_err());
    }

    #[test]
    fn test_failing_candidate_is_named() {
        let (x, y) = toy();
        let configs = vec![
            CandidateConfig::new("ok", Hyperparameters::new(3, Some(2), 42)),
            CandidateConfig::new("broken", Hyperparameters::new(0, Some(2), 42)),
        ];
        let err = CandidateTrainer::default().train(&x, &y, &configs).unwrap_err();
        match err {
            PipelineError::TrainingFailure { candidate, .. } => assert_eq!(candidate, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_train_in_order() {
        let (x, y) = toy();
        let configs = vec![
            CandidateConfig::new("a", Hyperparameters::new(3, Some(2), 42)),
            CandidateConfig::new("b", Hyperparameters::new(5, Some(3), 42)),
        ];
        let (split, results) = CandidateTrainer::default().train(&x, &y, &configs).unwrap();
        assert_eq!(split.n_test(), 8);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].config.name, "a");
        assert_eq!(results[1].config.name, "b");
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.accuracy)));
    }
}
