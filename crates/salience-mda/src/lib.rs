//! Significance-aware permutation importance for survey outcomes.
//!
//! Given a numeric respondent × feature matrix and one or more target
//! variables, fits a bagged-tree model per target on a train split, measures
//! how much the held-out score drops when each feature is shuffled, and turns
//! the repeated drops into ranked, interval-backed importance records. Those
//! records are then capped for reporting, summed per feature category, and
//! intersected across targets to find universal predictors.

mod budget;
mod category;
mod config;
mod cross_target;
mod dataset;
mod engine;
mod error;
mod permutation;
mod report;
mod splitter;
mod stats;
mod trainer;

pub use budget::{Budget, BudgetExceeded, CancellationToken};
pub use category::{
    CategoryBreakdown, CategoryImportance, UnclassifiedImportance, aggregate_categories,
};
pub use config::{AnalysisConfig, DEFAULT_TRAIN_RATIO};
pub use cross_target::{CrossTargetInsight, universal_predictors};
pub use dataset::{
    Dataset, EncodedTarget, FeatureMatrix, FeatureMetadata, MAX_NUMERIC_CLASSES, MIN_FEATURES,
    MIN_SAMPLES, PreparedTarget, TargetValues, TargetVariable,
};
pub use engine::{
    AnalysisReport, AnalysisSummary, Analyzer, TargetAnalysisResult, TargetOutcome, TargetState,
    target_seed,
};
pub use error::{AnalysisError, InsufficientDataError, TargetError, ValidationError};
pub use permutation::{
    ImportanceSample, PermutationError, PermutationOutcome, permutation_samples,
};
pub use report::ReportedFeatures;
pub use splitter::TrainTestSplit;
pub use stats::{FeatureImportanceRecord, aggregate, rank_order, t_critical};
pub use trainer::{ModelPerformance, Scorer, TrainedModel, check_trainable, train_target};

pub use salience_forest::SplitCriterion;
