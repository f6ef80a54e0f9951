//! Held-out permutation importance.
//!
//! Each feature column of the test split is shuffled `repetitions` times and
//! the trained model is re-scored; the drop from the unpermuted baseline is
//! one importance sample. The training split is never touched.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use salience_forest::{Outcome, RfError};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::budget::{Budget, BudgetExceeded};
use crate::trainer::Scorer;

/// One (feature, repetition) measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportanceSample {
    /// Column that was shuffled.
    pub feature_index: usize,
    /// Zero-based repetition number.
    pub repetition: usize,
    /// `baseline - permuted_score`; positive means the feature helps.
    pub delta: f64,
}

/// Baseline score plus every sample, grouped by feature.
#[derive(Debug, Clone)]
pub struct PermutationOutcome {
    /// Unpermuted test-split score.
    pub baseline: f64,
    /// `samples[feature]` holds that feature's repetitions in order.
    pub samples: Vec<Vec<ImportanceSample>>,
}

/// Why permutation stopped early.
#[derive(Debug, thiserror::Error)]
pub enum PermutationError {
    /// The budget tripped between feature blocks.
    #[error(transparent)]
    Interrupted(#[from] BudgetExceeded),
    /// The model rejected a permuted matrix.
    #[error(transparent)]
    Model(#[from] RfError),
}

/// Measure permutation importance of every column of `test_rows`.
///
/// Features run in parallel. Feature `f` draws its shuffles from stream `f`
/// of a ChaCha8 generator seeded with `seed`, so results do not depend on
/// thread scheduling and each repetition gets a fresh shuffle. The budget is
/// checked before each feature block.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PermutationError::Interrupted`] | the budget tripped |
/// | [`PermutationError::Model`] | scoring failed |
#[instrument(skip_all, fields(n_test = test_rows.len(), repetitions))]
pub fn permutation_samples<S: Scorer>(
    model: &S,
    test_rows: &[Vec<f64>],
    test_outcome: Outcome<'_>,
    repetitions: usize,
    seed: u64,
    budget: &Budget,
) -> Result<PermutationOutcome, PermutationError> {
    budget.check()?;
    let baseline = model.score(test_rows, test_outcome)?;
    let n_features = test_rows.first().map_or(0, Vec::len);

    let samples = (0..n_features)
        .into_par_iter()
        .map(|feature_index| {
            budget.check()?;
            permute_feature(
                model,
                test_rows,
                test_outcome,
                feature_index,
                repetitions,
                seed,
                baseline,
            )
        })
        .collect::<Result<Vec<_>, PermutationError>>()?;

    debug!(baseline, n_features, "permutation samples collected");
    Ok(PermutationOutcome { baseline, samples })
}

fn permute_feature<S: Scorer>(
    model: &S,
    test_rows: &[Vec<f64>],
    test_outcome: Outcome<'_>,
    feature_index: usize,
    repetitions: usize,
    seed: u64,
    baseline: f64,
) -> Result<Vec<ImportanceSample>, PermutationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(feature_index as u64);

    let original: Vec<f64> = test_rows.iter().map(|row| row[feature_index]).collect();
    let mut column = original.clone();
    let mut permuted = test_rows.to_vec();

    (0..repetitions)
        .map(|repetition| {
            column.copy_from_slice(&original);
            column.shuffle(&mut rng);
            for (row, &value) in permuted.iter_mut().zip(&column) {
                row[feature_index] = value;
            }
            let score = model.score(&permuted, test_outcome)?;
            Ok(ImportanceSample {
                feature_index,
                repetition,
                delta: baseline - score,
            })
        })
        .collect()
}
