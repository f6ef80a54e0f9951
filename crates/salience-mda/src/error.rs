//! Error taxonomy for the importance engine.

use std::time::Duration;

/// Malformed or insufficient input, raised before any model is trained.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Returned when the request declares no target variables.
    #[error("at least one target variable is required")]
    NoTargets,

    /// Returned when the feature matrix has too few samples.
    #[error("feature matrix has {n_samples} samples, minimum is {min}")]
    TooFewSamples {
        /// Number of samples supplied.
        n_samples: usize,
        /// Minimum number of samples accepted.
        min: usize,
    },

    /// Returned when a row's length differs from the first row's length.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending sample.
        sample_index: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        got: usize,
    },

    /// Returned when the matrix has too few feature columns.
    #[error("feature matrix has {n_features} features, minimum is {min}")]
    TooFewFeatures {
        /// Number of feature columns supplied.
        n_features: usize,
        /// Minimum number of feature columns accepted.
        min: usize,
    },

    /// Returned when a matrix value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// Zero-based index of the offending sample.
        sample_index: usize,
        /// Zero-based index of the offending feature.
        feature_index: usize,
    },

    /// Returned when the number of feature names differs from the column count.
    #[error("{names} feature names declared for {columns} matrix columns")]
    FeatureNameCountMismatch {
        /// Number of declared names.
        names: usize,
        /// Number of matrix columns.
        columns: usize,
    },

    /// Returned when two columns share a name.
    #[error("feature name \"{name}\" is declared more than once")]
    DuplicateFeatureName {
        /// The repeated name.
        name: String,
    },

    /// Returned when a feature name is empty.
    #[error("feature {feature_index} has an empty name")]
    EmptyFeatureName {
        /// Zero-based column index.
        feature_index: usize,
    },

    /// Returned when the category map names a feature that was never declared.
    #[error("category map references unknown feature \"{feature}\"")]
    UnknownCategoryFeature {
        /// The unknown feature name.
        feature: String,
    },

    /// Returned when a target's length differs from the sample count.
    #[error("target \"{target}\" has {got} values, expected {expected}")]
    TargetLengthMismatch {
        /// Offending target name.
        target: String,
        /// Number of samples in the matrix.
        expected: usize,
        /// Number of values in the target.
        got: usize,
    },

    /// Returned when a target has fewer than two distinct values.
    #[error("target \"{target}\" has {distinct} distinct value(s), at least 2 are required")]
    TargetTooHomogeneous {
        /// Offending target name.
        target: String,
        /// Number of distinct values found.
        distinct: usize,
    },

    /// Returned when a numeric target holds NaN or infinite values.
    #[error("target \"{target}\" has a non-finite value at sample {sample_index}")]
    NonFiniteTarget {
        /// Offending target name.
        target: String,
        /// Zero-based sample index.
        sample_index: usize,
    },

    /// Returned when two targets share a name.
    #[error("target name \"{name}\" is declared more than once")]
    DuplicateTargetName {
        /// The repeated name.
        name: String,
    },

    /// Returned when an analysis option is out of range.
    #[error("invalid option {name} = {value}: {reason}")]
    InvalidOption {
        /// Wire name of the option.
        name: &'static str,
        /// Supplied value, rendered.
        value: String,
        /// What the value must satisfy.
        reason: &'static str,
    },
}

/// A single target that cannot be modelled; scoped to that target only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("target \"{target}\" cannot be modelled: {reason} (train = {n_train}, test = {n_test})")]
pub struct InsufficientDataError {
    /// Offending target name.
    pub target: String,
    /// Human-readable cause.
    pub reason: String,
    /// Samples in the train split.
    pub n_train: usize,
    /// Samples in the test split.
    pub n_test: usize,
}

/// Errors that abort a whole analysis request.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Input rejected before training.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The configured time limit elapsed.
    #[error(
        "analysis exceeded its time limit of {limit:?} after {elapsed:?} \
         ({completed_targets}/{total_targets} targets completed)"
    )]
    ResourceExhausted {
        /// Time spent before the budget tripped.
        elapsed: Duration,
        /// Configured limit.
        limit: Duration,
        /// Targets fully aggregated before the abort.
        completed_targets: usize,
        /// Targets in the request.
        total_targets: usize,
    },

    /// The caller cancelled the analysis.
    #[error("analysis cancelled ({completed_targets}/{total_targets} targets completed)")]
    Cancelled {
        /// Targets fully aggregated before the abort.
        completed_targets: usize,
        /// Targets in the request.
        total_targets: usize,
    },
}

/// Why a single target ended in the failed state.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The target's splits cannot support a model.
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    /// The forest rejected the target's data.
    #[error("model error on target \"{target}\": {source}")]
    Model {
        /// Target being processed.
        target: String,
        /// Underlying forest error.
        source: salience_forest::RfError,
    },
}
