//! Configuration builder for an importance analysis.

use std::time::Duration;

use salience_forest::SplitCriterion;

use crate::error::ValidationError;

/// Default fraction of samples assigned to the train split.
pub const DEFAULT_TRAIN_RATIO: f64 = 2.0 / 3.0;

/// Configuration for one analysis request.
///
/// Construct via [`AnalysisConfig::new`], then chain `with_*` methods.
/// Values are checked by [`AnalysisConfig::validate`], which the analyzer
/// calls before touching any data.
///
/// # Defaults
///
/// | Parameter                      | Default |
/// |--------------------------------|---------|
/// | `train_ratio`                  | 2/3     |
/// | `n_estimators`                 | 100     |
/// | `max_depth`                    | 10      |
/// | `split_criterion`              | `Gini`  |
/// | `mda_repetitions`              | 10      |
/// | `significance_threshold`       | 0.01    |
/// | `max_features_significant`     | 5       |
/// | `max_features_non_significant` | 2       |
/// | `seed`                         | 42      |
/// | `time_limit`                   | `None`  |
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub(crate) train_ratio: f64,
    pub(crate) n_estimators: usize,
    pub(crate) max_depth: usize,
    pub(crate) split_criterion: SplitCriterion,
    pub(crate) mda_repetitions: usize,
    pub(crate) significance_threshold: f64,
    pub(crate) max_features_significant: usize,
    pub(crate) max_features_non_significant: usize,
    pub(crate) seed: u64,
    pub(crate) time_limit: Option<Duration>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisConfig {
    /// Create a config holding the defaults above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            train_ratio: DEFAULT_TRAIN_RATIO,
            n_estimators: 100,
            max_depth: 10,
            split_criterion: SplitCriterion::Gini,
            mda_repetitions: 10,
            significance_threshold: 0.01,
            max_features_significant: 5,
            max_features_non_significant: 2,
            seed: 42,
            time_limit: None,
        }
    }

    /// Set the train split ratio, in `(0, 1)`.
    #[must_use]
    pub fn with_train_ratio(mut self, train_ratio: f64) -> Self {
        self.train_ratio = train_ratio;
        self
    }

    /// Set the number of trees per target model.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Set the maximum tree depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the number of shuffles per feature.
    #[must_use]
    pub fn with_mda_repetitions(mut self, mda_repetitions: usize) -> Self {
        self.mda_repetitions = mda_repetitions;
        self
    }

    /// Set the two-sided significance level of the confidence interval.
    #[must_use]
    pub fn with_significance_threshold(mut self, significance_threshold: f64) -> Self {
        self.significance_threshold = significance_threshold;
        self
    }

    /// Set the cap on reported significant features per target.
    #[must_use]
    pub fn with_max_features_significant(mut self, max: usize) -> Self {
        self.max_features_significant = max;
        self
    }

    /// Set the cap on reported non-significant features per target.
    #[must_use]
    pub fn with_max_features_non_significant(mut self, max: usize) -> Self {
        self.max_features_non_significant = max;
        self
    }

    /// Set the seed driving the split, the forests and the shuffles.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set a wall-clock limit for the whole analysis. `None` means unbounded.
    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Return the train split ratio.
    #[must_use]
    pub fn train_ratio(&self) -> f64 {
        self.train_ratio
    }

    /// Return the number of trees per target model.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the maximum tree depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the number of shuffles per feature.
    #[must_use]
    pub fn mda_repetitions(&self) -> usize {
        self.mda_repetitions
    }

    /// Return the significance level.
    #[must_use]
    pub fn significance_threshold(&self) -> f64 {
        self.significance_threshold
    }

    /// Return the cap on reported significant features.
    #[must_use]
    pub fn max_features_significant(&self) -> usize {
        self.max_features_significant
    }

    /// Return the cap on reported non-significant features.
    #[must_use]
    pub fn max_features_non_significant(&self) -> usize {
        self.max_features_non_significant
    }

    /// Impurity used when a target is a classification.
    ///
    /// Regression targets always split on variance.
    #[must_use]
    pub fn with_split_criterion(mut self, split_criterion: SplitCriterion) -> Self {
        self.split_criterion = split_criterion;
        self
    }

    /// Return the classification split criterion.
    #[must_use]
    pub fn split_criterion(&self) -> SplitCriterion {
        self.split_criterion
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the time limit, if any.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Check every option is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOption`] naming the first offending
    /// option by its wire name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(invalid("trainRatio", self.train_ratio, "must be in (0, 1)"));
        }
        if self.n_estimators == 0 {
            return Err(invalid("nEstimators", self.n_estimators, "must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(invalid("maxDepth", self.max_depth, "must be at least 1"));
        }
        if self.mda_repetitions < 2 {
            return Err(invalid(
                "mdaRepetitions",
                self.mda_repetitions,
                "must be at least 2 for a confidence interval",
            ));
        }
        if !(self.significance_threshold > 0.0 && self.significance_threshold < 1.0) {
            return Err(invalid(
                "significanceThreshold",
                self.significance_threshold,
                "must be in (0, 1)",
            ));
        }
        if self.time_limit.is_some_and(|limit| limit.is_zero()) {
            return Err(ValidationError::InvalidOption {
                name: "timeLimit",
                value: "0s".to_string(),
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: impl ToString, reason: &'static str) -> ValidationError {
    ValidationError::InvalidOption {
        name,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::new();
        assert!(config.validate().is_ok());
        assert!((config.train_ratio() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(config.n_estimators(), 100);
        assert_eq!(config.max_depth(), 10);
        assert_eq!(config.split_criterion(), SplitCriterion::Gini);
        assert_eq!(config.mda_repetitions(), 10);
        assert_eq!(config.max_features_significant(), 5);
        assert_eq!(config.max_features_non_significant(), 2);
    }

    #[test]
    fn ratio_bounds_are_exclusive() {
        for ratio in [0.0, 1.0, -0.2, f64::NAN] {
            let err = AnalysisConfig::new()
                .with_train_ratio(ratio)
                .validate()
                .unwrap_err();
            assert!(matches!(
                err,
                ValidationError::InvalidOption {
                    name: "trainRatio",
                    ..
                }
            ));
        }
    }

    #[test]
    fn single_repetition_rejected() {
        let err = AnalysisConfig::new()
            .with_mda_repetitions(1)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidOption {
                name: "mdaRepetitions",
                ..
            }
        ));
    }

    #[test]
    fn zero_time_limit_rejected() {
        let err = AnalysisConfig::new()
            .with_time_limit(Some(Duration::ZERO))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("timeLimit"));
    }
}
