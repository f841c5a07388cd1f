//! Model selector

use super::trainer::CandidateResult;
use crate::error::{PipelineError, Result};
use tracing::info;

/// Winner plus every candidate considered, in evaluation order
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    winner_index: usize,
    results: Vec<CandidateResult>,
}

impl SelectionOutcome {
    pub fn winner(&self) -> &CandidateResult {
        &self.results[self.winner_index]
    }

    pub fn winner_index(&self) -> usize {
        self.winner_index
    }

    pub fn results(&self) -> &[CandidateResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<CandidateResult> {
        self.results
    }
}

/// Pick the candidate with the highest accuracy.
///
/// A candidate only takes the lead when its score is strictly greater than the
/// running maximum, so the earliest of several tied candidates wins.
pub fn select(results: Vec<CandidateResult>) -> Result<SelectionOutcome> {
    if results.is_empty() {
        return Err(PipelineError::EmptyCandidateSet);
    }

    let mut winner_index = 0;
    let mut best = results[0].accuracy;
    for (idx, result) in results.iter().enumerate().skip(1) {
        if result.accuracy > best {
            best = result.accuracy;
            winner_index = idx;
        }
    }

    info!(
        winner = %results[winner_index].config.name,
        accuracy = best,
        considered = results.len(),
        "Best model selected"
    );

    Ok(SelectionOutcome { winner_index, results })
}
