//! Impurity measures and the threshold search.

use rand::Rng;
use rand::seq::index;

use crate::node::{FeatureIndex, Impurity};
use crate::outcome::Outcome;

/// Criterion for measuring the quality of a classification split.
///
/// Regression trees always use variance reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns zero when `n_samples` is zero.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// Sufficient statistics of the outcome over a set of samples.
///
/// Supports incremental add/remove so a sorted scan can evaluate every
/// threshold in one pass.
#[derive(Debug, Clone)]
pub(crate) enum NodeStats {
    Counts(Vec<usize>),
    Moments { sum: f64, sum_sq: f64 },
}

impl NodeStats {
    pub(crate) fn empty(outcome: Outcome<'_>) -> Self {
        match outcome {
            Outcome::Classes { n_classes, .. } => NodeStats::Counts(vec![0; n_classes]),
            Outcome::Continuous(_) => NodeStats::Moments {
                sum: 0.0,
                sum_sq: 0.0,
            },
        }
    }

    pub(crate) fn from_samples(outcome: Outcome<'_>, sample_indices: &[usize]) -> Self {
        let mut stats = Self::empty(outcome);
        for &si in sample_indices {
            stats.add(outcome, si);
        }
        stats
    }

    pub(crate) fn add(&mut self, outcome: Outcome<'_>, sample: usize) {
        match (self, outcome) {
            (NodeStats::Counts(counts), Outcome::Classes { labels, .. }) => {
                counts[labels[sample]] += 1;
            }
            (NodeStats::Moments { sum, sum_sq }, Outcome::Continuous(values)) => {
                let v = values[sample];
                *sum += v;
                *sum_sq += v * v;
            }
            _ => unreachable!("node statistics always match the outcome they were built from"),
        }
    }

    pub(crate) fn remove(&mut self, outcome: Outcome<'_>, sample: usize) {
        match (self, outcome) {
            (NodeStats::Counts(counts), Outcome::Classes { labels, .. }) => {
                counts[labels[sample]] -= 1;
            }
            (NodeStats::Moments { sum, sum_sq }, Outcome::Continuous(values)) => {
                let v = values[sample];
                *sum -= v;
                *sum_sq -= v * v;
            }
            _ => unreachable!("node statistics always match the outcome they were built from"),
        }
    }

    /// Impurity of the node holding `n_samples` samples.
    ///
    /// Regression variance is clamped at zero to absorb cancellation error.
    pub(crate) fn impurity(&self, criterion: SplitCriterion, n_samples: usize) -> Impurity {
        match self {
            NodeStats::Counts(counts) => criterion.impurity(counts, n_samples),
            NodeStats::Moments { sum, sum_sq } => {
                if n_samples == 0 {
                    return Impurity::new(0.0);
                }
                let n = n_samples as f64;
                let mean = sum / n;
                Impurity::new((sum_sq / n - mean * mean).max(0.0))
            }
        }
    }
}

/// The winning threshold for one node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n * parent - n_left * left - n_right * right`, in impurity units.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Fixed inputs of a split search over one training set.
///
/// `columns` is column-major: `columns[feature][sample]`.
#[derive(Clone, Copy)]
pub(crate) struct SplitSearch<'a> {
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) outcome: Outcome<'a>,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

/// Best boundary found on a single column.
struct Candidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

impl SplitSearch<'_> {
    /// Best split of `samples` over `max_features` randomly drawn columns.
    ///
    /// `None` when every drawn column is constant on `samples` or no boundary
    /// leaves `min_samples_leaf` rows on both sides.
    pub(crate) fn best(&self, samples: &[usize], rng: &mut impl Rng) -> Option<SplitResult> {
        let n_columns = self.columns.len();
        if samples.len() < 2 || n_columns == 0 {
            return None;
        }
        let parent = NodeStats::from_samples(self.outcome, samples);
        let parent_weighted =
            samples.len() as f64 * parent.impurity(self.criterion, samples.len()).value();

        let drawn = index::sample(rng, n_columns, self.max_features.min(n_columns));
        let winner = drawn
            .iter()
            .filter_map(|feature| self.scan(feature, samples, &parent, parent_weighted))
            .fold(None::<Candidate>, |best, c| match best {
                Some(b) if b.decrease >= c.decrease => Some(b),
                _ => Some(c),
            })?;

        let column = &self.columns[winner.feature];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| column[s] <= winner.threshold);
        Some(SplitResult {
            feature: FeatureIndex::new(winner.feature),
            threshold: winner.threshold,
            impurity_decrease: winner.decrease,
            left_indices,
            right_indices,
        })
    }

    /// Sweep the sorted column once, moving rows from right to left.
    fn scan(
        &self,
        feature: usize,
        samples: &[usize],
        parent: &NodeStats,
        parent_weighted: f64,
    ) -> Option<Candidate> {
        let column = &self.columns[feature];
        let mut order: Vec<usize> = samples.to_vec();
        order.sort_unstable_by(|&a, &b| column[a].total_cmp(&column[b]));

        let n = order.len();
        let mut left = NodeStats::empty(self.outcome);
        let mut right = parent.clone();
        let mut best: Option<Candidate> = None;

        for (pos, pair) in order.windows(2).enumerate() {
            let (here, next) = (pair[0], pair[1]);
            left.add(self.outcome, here);
            right.remove(self.outcome, here);

            let (lo, hi) = (column[here], column[next]);
            let n_left = pos + 1;
            let n_right = n - n_left;
            if lo == hi || n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }
            let decrease = parent_weighted
                - n_left as f64 * left.impurity(self.criterion, n_left).value()
                - n_right as f64 * right.impurity(self.criterion, n_right).value();
            if best.as_ref().is_none_or(|b| decrease > b.decrease) {
                best = Some(Candidate {
                    feature,
                    threshold: (lo + hi) / 2.0,
                    decrease,
                });
            }
        }
        best
    }
}
