//! Bagged CART ensembles for survey targets.
//!
//! Trees split on Gini or entropy for class labels and on variance for
//! numeric responses. A [`ForestConfig`] fits a [`RandomForest`] in
//! parallel; the forest then scores held-out rows (accuracy or R²) and,
//! for classifiers, builds a [`ConfusionMatrix`].

mod config;
mod confusion;
mod error;
mod forest;
mod node;
mod outcome;
mod predict;
mod split;
mod tree;

pub use config::{ForestConfig, MaxFeatures};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForest;
pub use node::{FeatureIndex, Impurity, LeafValue, Node, NodeIndex};
pub use outcome::{Outcome, Task};
pub use predict::{ClassDistribution, Prediction, accuracy, r_squared};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
