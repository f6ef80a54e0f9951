//! Per-target model training on the train split.

use salience_forest::{ClassMetrics, ForestConfig, MaxFeatures, Outcome, RandomForest, RfError};
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::AnalysisConfig;
use crate::dataset::{EncodedTarget, FeatureMatrix, PreparedTarget};
use crate::error::{InsufficientDataError, TargetError};
use crate::splitter::TrainTestSplit;

/// Anything that can score itself against labelled rows.
///
/// The permutation engine only needs this, so it can run against stub
/// models in tests.
pub trait Scorer: Sync {
    /// Score `rows` against `outcome`; higher is better.
    ///
    /// # Errors
    ///
    /// Returns the model's error when the rows or outcome do not fit it.
    fn score(&self, rows: &[Vec<f64>], outcome: Outcome<'_>) -> Result<f64, RfError>;
}

impl Scorer for RandomForest {
    fn score(&self, rows: &[Vec<f64>], outcome: Outcome<'_>) -> Result<f64, RfError> {
        RandomForest::score(self, rows, outcome)
    }
}

/// Fit quality of one target's model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPerformance {
    /// `"classification"` or `"regression"`.
    pub task: &'static str,
    /// `"accuracy"` or `"r2"`.
    pub metric: &'static str,
    /// Score on the train split.
    pub train_score: f64,
    /// Score on the test split; the permutation baseline.
    pub test_score: f64,
    /// Train split size.
    pub train_samples: usize,
    /// Test split size.
    pub test_samples: usize,
    /// Trees in the ensemble.
    pub n_estimators: usize,
    /// Mean node count across trees.
    pub mean_tree_nodes: f64,
    /// Mean depth across trees.
    pub mean_tree_depth: f64,
    /// Class values in label order, for classification targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    /// Test-split confusion matrix, rows are true classes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confusion_matrix: Option<Vec<Vec<usize>>>,
    /// Test-split precision, recall and F1 per class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_metrics: Option<Vec<ClassMetrics>>,
    /// Unweighted mean F1 over classes present in the test split.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_f1: Option<f64>,
}

/// A forest fitted on one target's train split, with its test-split data.
///
/// Lives only for the duration of one analysis.
#[derive(Debug)]
pub struct TrainedModel {
    forest: RandomForest,
    test_rows: Vec<Vec<f64>>,
    test_target: EncodedTarget,
    performance: ModelPerformance,
}

impl TrainedModel {
    /// Return the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return the held-out rows.
    #[must_use]
    pub fn test_rows(&self) -> &[Vec<f64>] {
        &self.test_rows
    }

    /// Return the held-out outcome.
    #[must_use]
    pub fn test_outcome(&self) -> Outcome<'_> {
        self.test_target.as_outcome()
    }

    /// Return the fit quality.
    #[must_use]
    pub fn performance(&self) -> &ModelPerformance {
        &self.performance
    }

    /// Drop the model, keeping only its performance record.
    #[must_use]
    pub fn into_performance(self) -> ModelPerformance {
        self.performance
    }
}

/// Check that a target's splits can support a model.
///
/// # Errors
///
/// Returns [`InsufficientDataError`] when a classification train split holds
/// fewer than two classes, or the test split holds a class never seen in
/// train; or when a regression train split is constant.
pub fn check_trainable(
    target: &PreparedTarget,
    split: &TrainTestSplit,
) -> Result<(), InsufficientDataError> {
    let insufficient = |reason: String| InsufficientDataError {
        target: target.name.clone(),
        reason,
        n_train: split.n_train(),
        n_test: split.n_test(),
    };

    match &target.encoded {
        EncodedTarget::Classes {
            labels,
            class_names,
        } => {
            let mut in_train = vec![false; class_names.len()];
            for &i in split.train() {
                in_train[labels[i]] = true;
            }
            let train_classes = in_train.iter().filter(|&&present| present).count();
            if train_classes < 2 {
                return Err(insufficient(format!(
                    "train split contains {train_classes} class(es), at least 2 are required"
                )));
            }
            if let Some(&i) = split.test().iter().find(|&&i| !in_train[labels[i]]) {
                return Err(insufficient(format!(
                    "class \"{}\" occurs only in the test split",
                    class_names[labels[i]]
                )));
            }
        }
        EncodedTarget::Continuous(values) => {
            let first = values[split.train()[0]];
            if split.train().iter().all(|&i| values[i] == first) {
                return Err(insufficient("train split values are constant".to_string()));
            }
        }
    }
    Ok(())
}

/// Fit one forest on the train split of `target` and score it on both splits.
///
/// # Errors
///
/// Returns [`TargetError::InsufficientData`] from [`check_trainable`], or
/// [`TargetError::Model`] if the forest rejects the data.
#[instrument(skip_all, fields(target_name = %target.name, n_train = split.n_train()))]
pub fn train_target(
    matrix: &FeatureMatrix,
    feature_names: &[String],
    target: &PreparedTarget,
    split: &TrainTestSplit,
    config: &AnalysisConfig,
    seed: u64,
) -> Result<TrainedModel, TargetError> {
    check_trainable(target, split)?;

    let model_error = |source: RfError| TargetError::Model {
        target: target.name.clone(),
        source,
    };

    let train_rows = matrix.select(split.train());
    let train_y = target.encoded.select(split.train());
    let test_rows = matrix.select(split.test());
    let test_y = target.encoded.select(split.test());

    let forest = ForestConfig::new(config.n_estimators)
        .map_err(model_error)?
        .with_max_depth(Some(config.max_depth))
        .with_max_features(MaxFeatures::Sqrt)
        .with_criterion(config.split_criterion)
        .with_seed(seed)
        .fit(&train_rows, train_y.as_outcome(), feature_names)
        .map_err(model_error)?;

    let train_score = forest
        .score(&train_rows, train_y.as_outcome())
        .map_err(model_error)?;
    let test_score = forest
        .score(&test_rows, test_y.as_outcome())
        .map_err(model_error)?;

    let mut performance = ModelPerformance {
        task: forest.task().name(),
        metric: if target.encoded.is_classification() {
            "accuracy"
        } else {
            "r2"
        },
        train_score,
        test_score,
        train_samples: split.n_train(),
        test_samples: split.n_test(),
        n_estimators: forest.n_trees(),
        mean_tree_nodes: forest.mean_tree_nodes(),
        mean_tree_depth: forest.mean_tree_depth(),
        classes: None,
        confusion_matrix: None,
        class_metrics: None,
        macro_f1: None,
    };

    if let EncodedTarget::Classes {
        labels,
        class_names,
    } = &test_y
    {
        let cm = forest
            .confusion_matrix(&test_rows, labels)
            .map_err(model_error)?;
        performance.classes = Some(class_names.clone());
        performance.confusion_matrix = Some(cm.to_rows());
        performance.class_metrics = Some(cm.class_metrics());
        performance.macro_f1 = Some(cm.macro_f1());
    }

    info!(
        target_name = %target.name,
        task = performance.task,
        train_score,
        test_score,
        "model trained"
    );

    Ok(TrainedModel {
        forest,
        test_rows,
        test_target: test_y,
        performance,
    })
}
