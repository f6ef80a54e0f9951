//! Orchestration: split, train, permute and aggregate every target.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::budget::{Budget, BudgetExceeded, CancellationToken};
use crate::category::{CategoryBreakdown, aggregate_categories};
use crate::config::AnalysisConfig;
use crate::cross_target::{CrossTargetInsight, universal_predictors};
use crate::dataset::{Dataset, FeatureMatrix, FeatureMetadata, PreparedTarget, TargetVariable};
use crate::error::{AnalysisError, TargetError, ValidationError};
use crate::permutation::{PermutationError, permutation_samples};
use crate::report::ReportedFeatures;
use crate::splitter::TrainTestSplit;
use crate::stats::aggregate;
use crate::trainer::{ModelPerformance, train_target};

/// Salt separating the permutation stream from the forest's seed.
const PERMUTATION_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Lifecycle of one target within an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Not started.
    Pending,
    /// Fitting the forest on the train split.
    Training,
    /// Measuring permutation importance on the test split.
    Permuting,
    /// Statistics, caps and categories computed.
    Aggregated,
    /// Skipped with a recorded error.
    Failed,
}

impl TargetState {
    /// Lower-case name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TargetState::Pending => "pending",
            TargetState::Training => "training",
            TargetState::Permuting => "permuting",
            TargetState::Aggregated => "aggregated",
            TargetState::Failed => "failed",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything computed for a target that reached [`TargetState::Aggregated`].
#[derive(Debug, Clone)]
pub struct TargetAnalysisResult {
    /// Target name.
    pub target: String,
    /// Fit quality on both splits.
    pub performance: ModelPerformance,
    /// Capped and full feature records.
    pub reported: ReportedFeatures,
    /// Number of features scored.
    pub total_features: usize,
    /// Category sums and shares.
    pub categories: CategoryBreakdown,
}

/// Final state of one target.
#[derive(Debug)]
pub enum TargetOutcome {
    /// The target completed.
    Aggregated(Box<TargetAnalysisResult>),
    /// The target was skipped.
    Failed {
        /// Human-readable explanation.
        note: String,
        /// Structured cause.
        error: TargetError,
    },
}

impl TargetOutcome {
    /// Return the final state.
    #[must_use]
    pub fn state(&self) -> TargetState {
        match self {
            TargetOutcome::Aggregated(_) => TargetState::Aggregated,
            TargetOutcome::Failed { .. } => TargetState::Failed,
        }
    }

    /// Return the result of a completed target.
    #[must_use]
    pub fn result(&self) -> Option<&TargetAnalysisResult> {
        match self {
            TargetOutcome::Aggregated(result) => Some(&**result),
            TargetOutcome::Failed { .. } => None,
        }
    }
}

/// Request-wide counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Targets in the request.
    pub total_targets: usize,
    /// Targets that reached the aggregated state.
    pub successful_targets: usize,
    /// Targets that failed.
    pub failed_targets: usize,
    /// Feature columns.
    pub total_features: usize,
    /// Rows in the matrix.
    pub total_samples: usize,
    /// Rows in the shared train split.
    pub train_samples: usize,
    /// Rows in the shared test split.
    pub test_samples: usize,
}

/// The outcome of one analysis request.
#[derive(Debug)]
pub struct AnalysisReport {
    /// Per-target outcomes, keyed by target name.
    pub targets: BTreeMap<String, TargetOutcome>,
    /// Request-wide counts.
    pub summary: AnalysisSummary,
    /// Features significant for more than one target.
    pub universal_predictors: Vec<CrossTargetInsight>,
}

/// Runs importance analyses under one configuration.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    token: CancellationToken,
}

impl Analyzer {
    /// Create an analyzer with a fresh cancellation token.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            token: CancellationToken::new(),
        }
    }

    /// Use a caller-held cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Return the configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Validate raw inputs, then [`run`](Self::run) them.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Validation`] before any training when the
    /// inputs or the configuration are invalid, and the errors of
    /// [`run`](Self::run).
    pub fn analyze(
        &self,
        matrix: FeatureMatrix,
        metadata: FeatureMetadata,
        targets: Vec<TargetVariable>,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.config.validate()?;
        let dataset = Dataset::new(matrix, metadata, targets)?;
        self.run(&dataset)
    }

    /// Analyze every target of a validated dataset.
    ///
    /// Targets are processed in name order over one shared split. A target
    /// that cannot be modelled is recorded as failed and the others continue;
    /// a tripped budget aborts the whole request.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AnalysisError::Validation`] | the configuration is invalid |
    /// | [`AnalysisError::Cancelled`] | the token was cancelled |
    /// | [`AnalysisError::ResourceExhausted`] | the time limit elapsed |
    #[instrument(skip_all, fields(
        n_samples = dataset.n_samples(),
        n_features = dataset.n_features(),
        n_targets = dataset.targets().len(),
    ))]
    pub fn run(&self, dataset: &Dataset) -> Result<AnalysisReport, AnalysisError> {
        self.config.validate()?;
        let budget = Budget::new(self.token.clone(), self.config.time_limit);
        let total_targets = dataset.targets().len();
        let split = TrainTestSplit::new(dataset.n_samples(), self.config.train_ratio, self.config.seed)?;

        info!(
            n_train = split.n_train(),
            n_test = split.n_test(),
            repetitions = self.config.mda_repetitions,
            "starting analysis"
        );

        let mut targets: BTreeMap<String, TargetOutcome> = BTreeMap::new();
        for target in dataset.targets() {
            let completed = targets.len();
            let interrupted = |exceeded: BudgetExceeded| abort(exceeded, completed, total_targets);

            budget.check().map_err(interrupted)?;
            debug!(target_name = %target.name, state = %TargetState::Pending, "target queued");

            let outcome = match self.analyze_target(dataset, target, &split, &budget) {
                Ok(result) => TargetOutcome::Aggregated(Box::new(result)),
                Err(TargetStep::Interrupted(exceeded)) => return Err(interrupted(exceeded)),
                Err(TargetStep::Invalid(error)) => return Err(error.into()),
                Err(TargetStep::Failed(error)) => {
                    transition(&target.name, TargetState::Failed);
                    warn!(target_name = %target.name, %error, "target skipped");
                    TargetOutcome::Failed {
                        note: error.to_string(),
                        error,
                    }
                }
            };
            targets.insert(target.name.clone(), outcome);
        }

        let significant_sets: BTreeMap<&str, Vec<_>> = targets
            .iter()
            .filter_map(|(name, outcome)| {
                outcome
                    .result()
                    .map(|r| (name.as_str(), r.reported.all_significant().collect()))
            })
            .collect();
        let universal_predictors = universal_predictors(&significant_sets);

        let successful_targets = significant_sets.len();
        let summary = AnalysisSummary {
            total_targets,
            successful_targets,
            failed_targets: total_targets - successful_targets,
            total_features: dataset.n_features(),
            total_samples: dataset.n_samples(),
            train_samples: split.n_train(),
            test_samples: split.n_test(),
        };

        info!(
            successful_targets,
            failed_targets = summary.failed_targets,
            universal_predictors = universal_predictors.len(),
            elapsed_ms = budget.elapsed().as_millis() as u64,
            "analysis complete"
        );

        Ok(AnalysisReport {
            targets,
            summary,
            universal_predictors,
        })
    }

    fn analyze_target(
        &self,
        dataset: &Dataset,
        target: &PreparedTarget,
        split: &TrainTestSplit,
        budget: &Budget,
    ) -> Result<TargetAnalysisResult, TargetStep> {
        let seed = target_seed(self.config.seed, &target.name);

        transition(&target.name, TargetState::Training);
        let model = train_target(
            dataset.matrix(),
            dataset.feature_names(),
            target,
            split,
            &self.config,
            seed,
        )
        .map_err(TargetStep::Failed)?;

        transition(&target.name, TargetState::Permuting);
        let permutation = permutation_samples(
            model.forest(),
            model.test_rows(),
            model.test_outcome(),
            self.config.mda_repetitions,
            seed ^ PERMUTATION_SALT,
            budget,
        )
        .map_err(|e| match e {
            PermutationError::Interrupted(exceeded) => TargetStep::Interrupted(exceeded),
            PermutationError::Model(source) => TargetStep::Failed(TargetError::Model {
                target: target.name.clone(),
                source,
            }),
        })?;

        let records = aggregate(
            dataset.feature_names(),
            &permutation.samples,
            self.config.significance_threshold,
        )
        .map_err(TargetStep::Invalid)?;
        let categories = aggregate_categories(&records, dataset.metadata());
        let total_features = records.len();
        let reported = ReportedFeatures::new(
            records,
            self.config.max_features_significant,
            self.config.max_features_non_significant,
        );

        transition(&target.name, TargetState::Aggregated);
        info!(
            target_name = %target.name,
            baseline = permutation.baseline,
            significant = reported.all_significant().count(),
            "target aggregated"
        );

        Ok(TargetAnalysisResult {
            target: target.name.clone(),
            performance: model.into_performance(),
            reported,
            total_features,
            categories,
        })
    }
}

/// How a single target's processing ended early.
enum TargetStep {
    Failed(TargetError),
    Interrupted(BudgetExceeded),
    Invalid(ValidationError),
}

fn transition(target: &str, to: TargetState) {
    debug!(target_name = target, state = %to, "target state");
}

fn abort(exceeded: BudgetExceeded, completed_targets: usize, total_targets: usize) -> AnalysisError {
    match exceeded {
        BudgetExceeded::Cancelled => AnalysisError::Cancelled {
            completed_targets,
            total_targets,
        },
        BudgetExceeded::TimeLimit { elapsed, limit } => AnalysisError::ResourceExhausted {
            elapsed,
            limit,
            completed_targets,
            total_targets,
        },
    }
}

/// Mix the request seed with an FNV-1a hash of the target name.
///
/// Depends on the name only, never on the target's position.
#[must_use]
pub fn target_seed(seed: u64, name: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let hash = name
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
    seed ^ hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_seed_depends_on_name_only() {
        assert_eq!(target_seed(42, "buy"), target_seed(42, "buy"));
        assert_ne!(target_seed(42, "buy"), target_seed(42, "recommend"));
        assert_ne!(target_seed(42, "buy"), target_seed(43, "buy"));
    }

    #[test]
    fn state_names() {
        assert_eq!(TargetState::Permuting.to_string(), "permuting");
        assert_eq!(TargetState::Failed.name(), "failed");
    }

    #[test]
    fn abort_maps_budget_to_error() {
        assert!(matches!(
            abort(BudgetExceeded::Cancelled, 1, 3),
            AnalysisError::Cancelled {
                completed_targets: 1,
                total_targets: 3
            }
        ));
    }
}
