//! Prediction and scoring for the ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::confusion::ConfusionMatrix;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::node::LeafValue;
use crate::outcome::{Outcome, Task};

/// A single model prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    /// Predicted class label.
    Class(usize),
    /// Predicted real value.
    Value(f64),
}

/// Class probability distribution from a prediction.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Return the predicted class (argmax, lowest label on ties).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    fn check_width(&self, sample: &[f64]) -> Result<(), RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Predict a single sample.
    ///
    /// Classification averages the leaf distributions of all trees and takes
    /// the argmax; regression averages the leaf means.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<Prediction, RfError> {
        match self.task {
            Task::Classification { .. } => {
                Ok(Prediction::Class(self.predict_proba(sample)?.predicted_class()))
            }
            Task::Regression => {
                self.check_width(sample)?;
                let mut total = 0.0;
                for tree in &self.trees {
                    if let LeafValue::Mean(mean) = tree.leaf_value(sample)? {
                        total += mean;
                    }
                }
                Ok(Prediction::Value(total / self.trees.len() as f64))
            }
        }
    }

    /// Return the averaged class probability distribution for a single sample.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::TaskMismatch`] | the forest is a regressor |
    /// | [`RfError::PredictionFeatureMismatch`] | `sample.len() != n_features` |
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        let Task::Classification { n_classes } = self.task else {
            return Err(RfError::TaskMismatch {
                expected: "classification",
                found: self.task.name(),
            });
        };
        self.check_width(sample)?;

        let mut avg = vec![0.0f64; n_classes];
        for tree in &self.trees {
            if let LeafValue::Class { distribution, .. } = tree.leaf_value(sample)? {
                for (slot, p) in avg.iter_mut().zip(distribution) {
                    *slot += p;
                }
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution { probs: avg })
    }

    /// Predict a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<Prediction>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Score the forest against ground truth.
    ///
    /// Classification returns accuracy in `[0, 1]`; regression returns the
    /// coefficient of determination R² (which may be negative).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::OutcomeLengthMismatch`] | `outcome.len() != features.len()` |
    /// | [`RfError::TaskMismatch`] | outcome kind differs from the forest's task |
    /// | [`RfError::EmptyDataset`] | no rows to score |
    /// | [`RfError::PredictionFeatureMismatch`] | a row has the wrong width |
    pub fn score(&self, features: &[Vec<f64>], outcome: Outcome<'_>) -> Result<f64, RfError> {
        if outcome.len() != features.len() {
            return Err(RfError::OutcomeLengthMismatch {
                expected: features.len(),
                got: outcome.len(),
            });
        }
        if features.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        let predictions = self.predict_batch(features)?;
        match outcome {
            Outcome::Classes { labels, .. } => {
                let predicted = self.class_predictions(&predictions)?;
                Ok(accuracy(labels, &predicted))
            }
            Outcome::Continuous(values) => {
                let predicted = self.value_predictions(&predictions)?;
                Ok(r_squared(values, &predicted))
            }
        }
    }

    /// Build the confusion matrix of this classifier on `features`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::TaskMismatch`] for a regressor, and the errors of
    /// [`RandomForest::predict_batch`].
    pub fn confusion_matrix(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<ConfusionMatrix, RfError> {
        let Task::Classification { n_classes } = self.task else {
            return Err(RfError::TaskMismatch {
                expected: "classification",
                found: self.task.name(),
            });
        };
        let predicted = self.class_predictions(&self.predict_batch(features)?)?;
        ConfusionMatrix::from_labels(labels, &predicted, n_classes)
    }

    fn class_predictions(&self, predictions: &[Prediction]) -> Result<Vec<usize>, RfError> {
        predictions
            .iter()
            .map(|p| match p {
                Prediction::Class(c) => Ok(*c),
                Prediction::Value(_) => Err(RfError::TaskMismatch {
                    expected: "classification",
                    found: self.task.name(),
                }),
            })
            .collect()
    }

    fn value_predictions(&self, predictions: &[Prediction]) -> Result<Vec<f64>, RfError> {
        predictions
            .iter()
            .map(|p| match p {
                Prediction::Value(v) => Ok(*v),
                Prediction::Class(_) => Err(RfError::TaskMismatch {
                    expected: "regression",
                    found: self.task.name(),
                }),
            })
            .collect()
    }
}

/// Fraction of positions where `predicted` equals `truth`.
#[must_use]
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|&(&t, &p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Coefficient of determination.
///
/// When the truth is constant the denominator vanishes: a perfect fit scores
/// 1.0 and anything else scores 0.0.
#[must_use]
pub fn r_squared(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_tot: f64 = truth.iter().map(|&t| (t - mean).powi(2)).sum();
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForestConfig, MaxFeatures};

    #[test]
    fn accuracy_counts_matches() {
        assert!((accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]) - 0.75).abs() < 1e-12);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn r_squared_perfect_and_mean() {
        let truth = [1.0, 2.0, 3.0];
        assert!((r_squared(&truth, &truth) - 1.0).abs() < 1e-12);
        assert!(r_squared(&truth, &[2.0, 2.0, 2.0]).abs() < 1e-12);
        assert_eq!(r_squared(&[4.0, 4.0], &[4.0, 4.0]), 1.0);
        assert_eq!(r_squared(&[4.0, 4.0], &[3.0, 4.0]), 0.0);
    }

    fn small_classifier() -> (RandomForest, Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let names = vec!["x".to_string(), "y".to_string()];
        let forest = ForestConfig::new(10)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(
                &features,
                Outcome::Classes {
                    labels: &labels,
                    n_classes: 2,
                },
                &names,
            )
            .unwrap();
        (forest, features, labels)
    }

    #[test]
    fn proba_sums_to_one() {
        let (forest, _, _) = small_classifier();
        let proba = forest.predict_proba(&[5.0, 0.0]).unwrap();
        let sum: f64 = proba.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
    }

    #[test]
    fn score_rejects_mismatched_task() {
        let (forest, features, _) = small_classifier();
        let values = vec![0.0; features.len()];
        let err = forest
            .score(&features, Outcome::Continuous(&values))
            .unwrap_err();
        assert!(matches!(err, RfError::TaskMismatch { .. }));
    }

    #[test]
    fn score_rejects_length_mismatch() {
        let (forest, features, _) = small_classifier();
        let err = forest
            .score(
                &features,
                Outcome::Classes {
                    labels: &[0, 1],
                    n_classes: 2,
                },
            )
            .unwrap_err();
        assert!(matches!(err, RfError::OutcomeLengthMismatch { .. }));
    }

    #[test]
    fn confusion_matrix_on_training_rows() {
        let (forest, features, labels) = small_classifier();
        let cm = forest.confusion_matrix(&features, &labels).unwrap();
        assert_eq!(cm.n_classes(), 2);
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
    }
}
