//! Ensemble hyperparameters.

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::outcome::Outcome;
use crate::split::SplitCriterion;

/// How many candidate columns each split looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// `ceil(sqrt(M))`, the usual choice for bagged trees.
    Sqrt,
    /// `ceil(log2(M))`, at least 1.
    Log2,
    /// `ceil(f * M)` for `f` in `(0, 1]`.
    Fraction(f64),
    /// Exactly this many.
    Fixed(usize),
    /// Every column.
    All,
}

impl MaxFeatures {
    /// Resolve against a matrix with `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] when the count falls outside
    /// `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let m = n_features as f64;
        let resolved = match self {
            MaxFeatures::Sqrt => m.sqrt().ceil() as usize,
            MaxFeatures::Log2 => m.log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (m * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Hyperparameters of a bagged CART ensemble.
///
/// | Parameter            | Default    | Meaning                                  |
/// |----------------------|------------|------------------------------------------|
/// | `n_trees`            | (required) | ensemble size                            |
/// | `max_depth`          | `Some(10)` | root is depth 0; `None` grows to purity  |
/// | `max_features`       | `Sqrt`     | candidate columns per split              |
/// | `min_samples_split`  | 2          | smallest node that may split             |
/// | `min_samples_leaf`   | 1          | smallest child a split may leave         |
/// | `criterion`          | `Gini`     | classification impurity                  |
/// | `bootstrap_fraction` | 1.0        | draws per tree as a share of the rows    |
/// | `seed`               | 42         | master seed for bootstraps and splits    |
///
/// Regression trees ignore `criterion` and split on variance.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_depth: Option<usize>,
    pub(crate) max_features: MaxFeatures,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) bootstrap_fraction: f64,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Start from the defaults with `n_trees` trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] for zero trees.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_depth: Some(10),
            max_features: MaxFeatures::Sqrt,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            bootstrap_fraction: 1.0,
            seed: 42,
        })
    }

    /// Depth cap; `None` lets trees grow until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Candidate columns per split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Smallest node that may split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Smallest child a split may leave.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Impurity used by classification trees.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Bootstrap draws per tree, as a share of the training rows.
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Master seed; the same seed and data give the same forest.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Ensemble size.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Depth cap.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Candidate columns per split.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Bootstrap share.
    #[must_use]
    pub fn bootstrap_fraction(&self) -> f64 {
        self.bootstrap_fraction
    }

    /// Master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the settings that do not depend on the data.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split < 2` |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf < 1` |
    /// | [`RfError::InvalidBootstrapFraction`] | fraction outside `(0, 1]` |
    pub fn validate(&self) -> Result<(), RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        if !(self.bootstrap_fraction > 0.0 && self.bootstrap_fraction <= 1.0) {
            return Err(RfError::InvalidBootstrapFraction {
                fraction: self.bootstrap_fraction,
            });
        }
        Ok(())
    }

    /// Fit a forest to row-major `features` and one `outcome` entry per row.
    ///
    /// `feature_names` are stored on the model for reporting.
    ///
    /// # Errors
    ///
    /// The errors of [`ForestConfig::validate`] and [`MaxFeatures::resolve`],
    /// plus data errors: [`RfError::EmptyDataset`], [`RfError::ZeroFeatures`],
    /// [`RfError::FeatureCountMismatch`], [`RfError::NonFiniteValue`],
    /// [`RfError::OutcomeLengthMismatch`], [`RfError::LabelOutOfRange`] and
    /// [`RfError::NonFiniteOutcome`].
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        outcome: Outcome<'_>,
        feature_names: &[String],
    ) -> Result<RandomForest, RfError> {
        crate::forest::train(self, features, outcome, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            ForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn defaults_match_survey_settings() {
        let config = ForestConfig::new(100).unwrap();
        assert_eq!(config.max_depth(), Some(10));
        assert_eq!(config.max_features(), MaxFeatures::Sqrt);
        assert_eq!(config.seed(), 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(5).unwrap(), 3);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(7).unwrap(), 4);
        assert!(MaxFeatures::Fixed(9).resolve(4).is_err());
    }

    #[test]
    fn validate_catches_bad_settings() {
        let base = ForestConfig::new(3).unwrap();
        assert!(matches!(
            base.clone().with_max_depth(Some(0)).validate(),
            Err(RfError::InvalidMaxDepth { .. })
        ));
        assert!(matches!(
            base.clone().with_min_samples_leaf(0).validate(),
            Err(RfError::InvalidMinSamplesLeaf { .. })
        ));
        assert!(matches!(
            base.with_bootstrap_fraction(0.0).validate(),
            Err(RfError::InvalidBootstrapFraction { .. })
        ));
    }
}
