//! Held-out class diagnostics.

use crate::error::RfError;

/// Counts of (true class, predicted class) pairs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConfusionMatrix {
    n_classes: usize,
    /// Row-major, `counts[truth * n_classes + predicted]`.
    counts: Vec<usize>,
}

/// Precision, recall and F1 of one class. Undefined ratios are 0.0.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassMetrics {
    pub class: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// True rows of this class.
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ConfusionMatrix {
    /// Tally paired true and predicted labels.
    ///
    /// # Errors
    ///
    /// [`RfError::EmptyDataset`] for no labels,
    /// [`RfError::OutcomeLengthMismatch`] when the slices differ in length and
    /// [`RfError::LabelOutOfRange`] when either label is `>= n_classes`.
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if predicted.len() != true_labels.len() {
            return Err(RfError::OutcomeLengthMismatch {
                expected: true_labels.len(),
                got: predicted.len(),
            });
        }
        let mut counts = vec![0usize; n_classes * n_classes];
        for (sample_index, (&truth, &guess)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(label) = [truth, guess].into_iter().find(|&l| l >= n_classes) {
                return Err(RfError::LabelOutOfRange {
                    label,
                    n_classes,
                    sample_index,
                });
            }
            counts[truth * n_classes + guess] += 1;
        }
        Ok(Self { n_classes, counts })
    }

    fn count(&self, truth: usize, predicted: usize) -> usize {
        self.counts[truth * self.n_classes + predicted]
    }

    /// Share of rows on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let hits: usize = (0..self.n_classes).map(|c| self.count(c, c)).sum();
        ratio(hits, self.counts.iter().sum())
    }

    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|class| {
                let hits = self.count(class, class);
                let support: usize = (0..self.n_classes).map(|p| self.count(class, p)).sum();
                let claimed: usize = (0..self.n_classes).map(|t| self.count(t, class)).sum();
                let precision = ratio(hits, claimed);
                let recall = ratio(hits, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Mean F1 over classes present in the truth.
    #[must_use]
    pub fn macro_f1(&self) -> f64 {
        let (sum, present) = self
            .class_metrics()
            .iter()
            .filter(|m| m.support > 0)
            .fold((0.0, 0usize), |(sum, n), m| (sum + m.f1, n + 1));
        if present == 0 { 0.0 } else { sum / present as f64 }
    }

    /// Nested rows, true class first.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<usize>> {
        self.counts
            .chunks(self.n_classes.max(1))
            .map(<[usize]>::to_vec)
            .collect()
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
