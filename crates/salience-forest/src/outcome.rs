//! Supervised outcomes: what a forest is trained to predict.

use crate::error::RfError;

/// Borrowed view of the response variable for training or scoring.
///
/// Classification labels must be zero-based and strictly below `n_classes`.
/// `n_classes` is declared rather than inferred so that a subset of rows
/// (a train split, say) can omit some classes without shrinking the model's
/// output space.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    /// Class labels in `0..n_classes`.
    Classes {
        /// Label per sample.
        labels: &'a [usize],
        /// Total number of classes in the label space.
        n_classes: usize,
    },
    /// Real-valued responses.
    Continuous(&'a [f64]),
}

impl Outcome<'_> {
    /// Return the number of samples in the outcome.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Outcome::Classes { labels, .. } => labels.len(),
            Outcome::Continuous(values) => values.len(),
        }
    }

    /// Return `true` if the outcome has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the learning task implied by this outcome.
    #[must_use]
    pub fn task(&self) -> Task {
        match self {
            Outcome::Classes { n_classes, .. } => Task::Classification {
                n_classes: *n_classes,
            },
            Outcome::Continuous(_) => Task::Regression,
        }
    }

    /// Check labels are in range and continuous values are finite.
    pub(crate) fn validate(&self) -> Result<(), RfError> {
        match self {
            Outcome::Classes { labels, n_classes } => {
                if *n_classes == 0 {
                    return Err(RfError::ZeroClasses);
                }
                if let Some((sample_index, &label)) =
                    labels.iter().enumerate().find(|&(_, &l)| l >= *n_classes)
                {
                    return Err(RfError::LabelOutOfRange {
                        label,
                        n_classes: *n_classes,
                        sample_index,
                    });
                }
            }
            Outcome::Continuous(values) => {
                if let Some(sample_index) = values.iter().position(|v| !v.is_finite()) {
                    return Err(RfError::NonFiniteOutcome { sample_index });
                }
            }
        }
        Ok(())
    }
}

/// The learning task a model was fitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Task {
    /// Predict one of `n_classes` discrete labels.
    Classification {
        /// Number of classes in the label space.
        n_classes: usize,
    },
    /// Predict a real value.
    Regression,
}

impl Task {
    /// Human-readable task name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Task::Classification { .. } => "classification",
            Task::Regression => "regression",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_out_of_range_rejected() {
        let labels = [0, 1, 3];
        let outcome = Outcome::Classes {
            labels: &labels,
            n_classes: 3,
        };
        assert!(matches!(
            outcome.validate(),
            Err(RfError::LabelOutOfRange {
                label: 3,
                sample_index: 2,
                ..
            })
        ));
    }

    #[test]
    fn non_finite_continuous_rejected() {
        let values = [1.0, f64::INFINITY];
        let outcome = Outcome::Continuous(&values);
        assert!(matches!(
            outcome.validate(),
            Err(RfError::NonFiniteOutcome { sample_index: 1 })
        ));
    }

    #[test]
    fn task_reflects_variant() {
        let labels = [0, 1];
        let classes = Outcome::Classes {
            labels: &labels,
            n_classes: 2,
        };
        assert_eq!(classes.task(), Task::Classification { n_classes: 2 });
        assert_eq!(Outcome::Continuous(&[1.0]).task(), Task::Regression);
        assert_eq!(Task::Regression.name(), "regression");
    }
}
