//! Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::ForestConfig;
use crate::error::RfError;
use crate::outcome::{Outcome, Task};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted bagged-tree ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) task: Task,
    pub(crate) feature_names: Vec<String>,
    pub(crate) max_features_resolved: usize,
}

/// Check the row-major matrix is non-empty, rectangular and finite.
///
/// Returns the feature count.
pub(crate) fn validate_rows(features: &[Vec<f64>]) -> Result<usize, RfError> {
    let Some(first) = features.first() else {
        return Err(RfError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Draw `draw_count` sample indices with replacement.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Gather the rows and outcome entries picked by `indices`.
fn gather<'a>(
    features: &[Vec<f64>],
    outcome: Outcome<'_>,
    indices: &[usize],
    labels_buf: &'a mut Vec<usize>,
    values_buf: &'a mut Vec<f64>,
) -> (Vec<Vec<f64>>, Outcome<'a>) {
    let rows = indices.iter().map(|&i| features[i].clone()).collect();
    let picked = match outcome {
        Outcome::Classes { labels, n_classes } => {
            labels_buf.extend(indices.iter().map(|&i| labels[i]));
            Outcome::Classes {
                labels: labels_buf.as_slice(),
                n_classes,
            }
        }
        Outcome::Continuous(values) => {
            values_buf.extend(indices.iter().map(|&i| values[i]));
            Outcome::Continuous(values_buf.as_slice())
        }
    };
    (rows, picked)
}

/// Train the ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &ForestConfig,
    features: &[Vec<f64>],
    outcome: Outcome<'_>,
    feature_names: &[String],
) -> Result<RandomForest, RfError> {
    let n_features = validate_rows(features)?;
    let n_samples = features.len();
    if outcome.len() != n_samples {
        return Err(RfError::OutcomeLengthMismatch {
            expected: n_samples,
            got: outcome.len(),
        });
    }
    outcome.validate()?;

    config.validate()?;
    let max_features_resolved = config.max_features.resolve(n_features)?;
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        task = outcome.task().name(),
        max_features = max_features_resolved,
        draw_count,
        "training forest"
    );

    // Tree seeds are drawn up front; rayon scheduling must not change the forest.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap_indices = bootstrap_sample(n_samples, draw_count, &mut rng);

            let mut labels_buf = Vec::new();
            let mut values_buf = Vec::new();
            let (boot_features, boot_outcome) = gather(
                features,
                outcome,
                &bootstrap_indices,
                &mut labels_buf,
                &mut values_buf,
            );

            tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit(&boot_features, boot_outcome)
        })
        .collect::<Result<_, _>>()?;

    debug!(n_trees_trained = trees.len(), "tree training complete");

    Ok(RandomForest {
        trees,
        n_features,
        task: outcome.task(),
        feature_names: feature_names.to_vec(),
        max_features_resolved,
    })
}

impl RandomForest {
    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the task this forest was trained for.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the resolved number of features tried per split.
    #[must_use]
    pub fn max_features_resolved(&self) -> usize {
        self.max_features_resolved
    }

    /// Borrow the individual trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean node count across trees.
    #[must_use]
    pub fn mean_tree_nodes(&self) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.n_nodes() as f64).sum::<f64>() / self.trees.len() as f64
    }

    /// Mean depth across trees.
    #[must_use]
    pub fn mean_tree_depth(&self) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.depth() as f64).sum::<f64>() / self.trees.len() as f64
    }
}
