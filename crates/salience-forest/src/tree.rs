use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{LeafValue, Node, NodeIndex},
    outcome::{Outcome, Task},
    predict::Prediction,
    split::{NodeStats, SplitCriterion, SplitSearch},
};

/// Impurity at or below which a node is treated as pure.
const PURITY_EPSILON: f64 = 1e-12;

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
///
/// `criterion` only applies to classification outcomes; regression trees
/// split on variance reduction.
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the classification split criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features considered at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a decision tree on row-major `features` against `outcome`.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                            |
    /// |--------------------------------------|-------------------------------------------------|
    /// | [`RfError::EmptyDataset`]            | `features` is empty                             |
    /// | [`RfError::ZeroFeatures`]            | rows have zero feature columns                  |
    /// | [`RfError::FeatureCountMismatch`]    | rows have inconsistent lengths                  |
    /// | [`RfError::NonFiniteValue`]          | any feature value is NaN or infinite            |
    /// | [`RfError::OutcomeLengthMismatch`]   | `outcome.len() != features.len()`              |
    /// | [`RfError::LabelOutOfRange`]         | a class label is `>= n_classes`                 |
    /// | [`RfError::NonFiniteOutcome`]        | a continuous outcome is NaN or infinite         |
    /// | [`RfError::InvalidMaxFeatures`]      | `max_features` resolves outside [1, n_features] |
    /// | [`RfError::InvalidMaxDepth`]         | `max_depth` is `Some(0)`                        |
    /// | [`RfError::InvalidMinSamplesSplit`]  | `min_samples_split` < 2                         |
    /// | [`RfError::InvalidMinSamplesLeaf`]   | `min_samples_leaf` < 1                          |
    #[instrument(skip(self, features, outcome), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], outcome: Outcome<'_>) -> Result<DecisionTree, RfError> {
        let n_features = crate::forest::validate_rows(features)?;
        if outcome.len() != features.len() {
            return Err(RfError::OutcomeLengthMismatch {
                expected: features.len(),
                got: outcome.len(),
            });
        }
        outcome.validate()?;

        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        // Column-major for the sorted split scan.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..features.len()).collect();
        let mut builder = TreeBuilder {
            col_features: &col_features,
            outcome,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.build(&sample_indices, 0);

        debug!(
            n_nodes = builder.arena.len(),
            task = outcome.task().name(),
            "decision tree built"
        );

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
            task: outcome.task(),
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct TreeBuilder<'a> {
    col_features: &'a [Vec<f64>],
    outcome: Outcome<'a>,
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Recursively grow the subtree for `sample_indices` and return its root.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let stats = NodeStats::from_samples(self.outcome, sample_indices);
        let impurity = stats.impurity(self.config.criterion, n_samples);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = impurity.value() <= PURITY_EPSILON;

        let split = if too_few || pure || depth_exceeded {
            None
        } else {
            SplitSearch {
                columns: self.col_features,
                outcome: self.outcome,
                criterion: self.config.criterion,
                max_features: self.max_features,
                min_samples_leaf: self.config.min_samples_leaf,
            }
            .best(sample_indices, &mut self.rng)
        };

        let Some(split) = split else {
            let idx = self.arena.len();
            self.arena.push(Node::Leaf {
                value: leaf_value(&stats, n_samples),
                impurity,
                n_samples,
            });
            return NodeIndex::new(idx);
        };

        // Reserve the slot, grow children, then overwrite with the split.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value: LeafValue::Mean(0.0),
            impurity,
            n_samples,
        });

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };

        NodeIndex::new(node_idx)
    }
}

fn leaf_value(stats: &NodeStats, n_samples: usize) -> LeafValue {
    let total = n_samples.max(1) as f64;
    match stats {
        NodeStats::Counts(counts) => {
            let distribution = counts.iter().map(|&c| c as f64 / total).collect();
            let prediction = counts
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            LeafValue::Class {
                prediction,
                distribution,
            }
        }
        NodeStats::Moments { sum, .. } => LeafValue::Mean(sum / total),
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) task: Task,
}

impl DecisionTree {
    /// Return the leaf reached by `sample`.
    ///
    /// Traverses from the root: at each split, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn leaf_value(&self, sample: &[f64]) -> Result<&LeafValue, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Predict a single sample with this tree alone.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<Prediction, RfError> {
        Ok(match self.leaf_value(sample)? {
            LeafValue::Class { prediction, .. } => Prediction::Class(*prediction),
            LeafValue::Mean(mean) => Prediction::Value(*mean),
        })
    }

    /// Return the task this tree was trained for.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree. A lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node_idx, d)) = stack.pop() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(labels: &[usize], n_classes: usize) -> Outcome<'_> {
        Outcome::Classes { labels, n_classes }
    }

    #[test]
    fn empty_dataset_error() {
        let err = DecisionTreeConfig::new()
            .fit(&[], classes(&[], 2))
            .unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = DecisionTreeConfig::new()
            .fit(&features, classes(&[0, 0, 0], 1))
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), Prediction::Class(0));
    }

    #[test]
    fn linearly_separable_correct_split() {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        let tree = DecisionTreeConfig::new()
            .with_seed(42)
            .fit(&features, classes(&[0, 0, 0, 1, 1, 1], 2))
            .unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), Prediction::Class(0));
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), Prediction::Class(1));
    }

    #[test]
    fn xor_needs_depth_at_least_2() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let tree = DecisionTreeConfig::new()
            .with_seed(42)
            .fit(&features, classes(&[0, 1, 1, 0], 2))
            .unwrap();
        assert!(tree.depth() >= 2);
    }

    #[test]
    fn max_depth_limits_tree() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&features, classes(&[0, 1, 1, 0], 2))
            .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn regression_tree_recovers_step() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let values: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 5.0 }).collect();
        let tree = DecisionTreeConfig::new()
            .fit(&features, Outcome::Continuous(&values))
            .unwrap();
        assert_eq!(tree.task(), Task::Regression);
        assert_eq!(tree.predict(&[2.0]).unwrap(), Prediction::Value(1.0));
        assert_eq!(tree.predict(&[8.0]).unwrap(), Prediction::Value(5.0));
    }

    #[test]
    fn absent_class_keeps_full_distribution_width() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let tree = DecisionTreeConfig::new()
            .fit(&features, classes(&[0, 0, 0], 3))
            .unwrap();
        match tree.leaf_value(&[1.0]).unwrap() {
            LeafValue::Class { distribution, .. } => assert_eq!(distribution.len(), 3),
            LeafValue::Mean(_) => panic!("expected a class leaf"),
        }
    }

    #[test]
    fn prediction_feature_mismatch() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let tree = DecisionTreeConfig::new()
            .fit(&features, classes(&[0, 1], 2))
            .unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn outcome_length_mismatch_error() {
        let features = vec![vec![1.0], vec![2.0]];
        let err = DecisionTreeConfig::new()
            .fit(&features, classes(&[0], 2))
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::OutcomeLengthMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn non_finite_value_error() {
        let features = vec![vec![1.0, f64::NAN], vec![3.0, 4.0]];
        let err = DecisionTreeConfig::new()
            .fit(&features, classes(&[0, 1], 2))
            .unwrap_err();
        assert!(matches!(err, RfError::NonFiniteValue { .. }));
    }
}
