//! Seeded train/test partition of sample indices.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::ValidationError;

/// Disjoint train and test index sets covering `0..n_samples`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n_samples` with a seeded RNG and cut it at
    /// `round(train_ratio * n_samples)`, clamped so neither side is empty.
    ///
    /// Both index lists are returned sorted ascending.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ValidationError::TooFewSamples`] | fewer than 2 samples |
    /// | [`ValidationError::InvalidOption`] | `train_ratio` is not in `(0, 1)` |
    pub fn new(n_samples: usize, train_ratio: f64, seed: u64) -> Result<Self, ValidationError> {
        if n_samples < 2 {
            return Err(ValidationError::TooFewSamples { n_samples, min: 2 });
        }
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(ValidationError::InvalidOption {
                name: "trainRatio",
                value: train_ratio.to_string(),
                reason: "must be in (0, 1)",
            });
        }

        let n_train = ((train_ratio * n_samples as f64).round() as usize).clamp(1, n_samples - 1);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n_samples).collect();
        indices.shuffle(&mut rng);

        let mut test = indices.split_off(n_train);
        let mut train = indices;
        train.sort_unstable();
        test.sort_unstable();

        debug!(n_samples, n_train, n_test = test.len(), "split samples");
        Ok(Self { train, test })
    }

    /// Return the train indices.
    #[must_use]
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    /// Return the test indices.
    #[must_use]
    pub fn test(&self) -> &[usize] {
        &self.test
    }

    /// Return the number of train samples.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    /// Return the number of test samples.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.test.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_ratio_within_one_sample() {
        for n in 10..60 {
            for ratio in [0.1, 0.5, 2.0 / 3.0, 0.8, 0.95] {
                let split = TrainTestSplit::new(n, ratio, 7).unwrap();
                assert!(split.n_train() >= 1 && split.n_train() < n);
                assert_eq!(split.n_train() + split.n_test(), n);
                let diff = (split.n_train() as f64 - ratio * n as f64).abs();
                assert!(diff <= 1.0, "n = {n}, ratio = {ratio}, train = {}", split.n_train());
            }
        }
    }

    #[test]
    fn partition_is_disjoint_and_complete() {
        let split = TrainTestSplit::new(30, 2.0 / 3.0, 1).unwrap();
        let mut all: Vec<usize> = split.train().iter().chain(split.test()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..30).collect::<Vec<_>>());
        assert_eq!(split.n_train(), 20);
    }

    #[test]
    fn extreme_ratio_keeps_test_non_empty() {
        let split = TrainTestSplit::new(10, 0.99, 3).unwrap();
        assert_eq!(split.n_train(), 9);
        assert_eq!(split.n_test(), 1);
    }

    #[test]
    fn same_seed_same_split() {
        let a = TrainTestSplit::new(40, 0.7, 11).unwrap();
        let b = TrainTestSplit::new(40, 0.7, 11).unwrap();
        let c = TrainTestSplit::new(40, 0.7, 12).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.test(), c.test());
    }

    #[test]
    fn ratio_out_of_range_rejected() {
        assert!(TrainTestSplit::new(10, 1.0, 0).is_err());
        assert!(TrainTestSplit::new(10, 0.0, 0).is_err());
    }
}
