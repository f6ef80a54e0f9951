//! Error type shared by fitting, prediction and scoring.

/// Everything that can go wrong inside the forest.
///
/// Hyperparameter problems surface before any tree is grown; data problems
/// carry the row (and column) that tripped them.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    // Hyperparameters.
    /// The ensemble was asked for no trees.
    #[error("a forest needs at least one tree, got n_trees = {n_trees}")]
    InvalidTreeCount { n_trees: usize },

    /// A depth cap of zero would leave only the root.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth { max_depth: usize },

    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit { min_samples_split: usize },

    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf { min_samples_leaf: usize },

    /// The candidate-column rule resolved outside `[1, n_features]`.
    #[error("max_features resolved to {max_features}, outside [1, {n_features}]")]
    InvalidMaxFeatures {
        max_features: usize,
        n_features: usize,
    },

    #[error("bootstrap_fraction must lie in (0, 1], got {fraction}")]
    InvalidBootstrapFraction { fraction: f64 },

    // Training data.
    #[error("no rows to train or score on")]
    EmptyDataset,

    #[error("rows have no feature columns")]
    ZeroFeatures,

    /// A row is shorter or longer than the first row.
    #[error("row {sample_index} has {got} columns where {expected} were expected")]
    FeatureCountMismatch {
        expected: usize,
        got: usize,
        sample_index: usize,
    },

    #[error("cell ({sample_index}, {feature_index}) is NaN or infinite")]
    NonFiniteValue {
        sample_index: usize,
        feature_index: usize,
    },

    #[error("outcome at row {sample_index} is NaN or infinite")]
    NonFiniteOutcome { sample_index: usize },

    /// Outcome and feature rows disagree in count.
    #[error("{got} outcome entries for {expected} rows")]
    OutcomeLengthMismatch { expected: usize, got: usize },

    /// A label at or above the declared class count.
    #[error("label {label} at row {sample_index} is not below n_classes = {n_classes}")]
    LabelOutOfRange {
        label: usize,
        n_classes: usize,
        sample_index: usize,
    },

    #[error("a classification outcome must declare at least one class")]
    ZeroClasses,

    // Fitted-model use.
    /// A row passed to a fitted model has the wrong width.
    #[error("model expects {expected} columns, got {got}")]
    PredictionFeatureMismatch { expected: usize, got: usize },

    /// Classification-only call on a regressor, or the reverse.
    #[error("this call needs a {expected} model, found a {found} model")]
    TaskMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
