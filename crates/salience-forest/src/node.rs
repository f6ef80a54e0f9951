//! Arena node types for fitted trees.

use std::fmt;

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(usize);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index)
            }

            /// Zero-based position.
            #[must_use]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_index!(
    /// Column of the feature matrix a split tests.
    FeatureIndex
);

arena_index!(
    /// Slot of a node in its tree's `Vec<Node>`.
    NodeIndex
);

/// Impurity of a node: Gini or entropy for classes, variance for values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Payload of a leaf.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum LeafValue {
    /// Majority class plus the class shares it was picked from.
    Class {
        prediction: usize,
        distribution: Vec<f64>,
    },
    /// Mean response of the rows that landed here.
    Mean(f64),
}

/// One entry of a tree arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Rows with `row[feature] <= threshold` go `left`, the rest `right`.
    Split {
        feature: FeatureIndex,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        impurity: Impurity,
        n_samples: usize,
        /// Sample-weighted impurity drop achieved by the split.
        impurity_decrease: f64,
    },
    Leaf {
        value: LeafValue,
        impurity: Impurity,
        n_samples: usize,
    },
}

impl Node {
    /// Impurity of the rows reaching this node, before any split.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Training rows that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_leaf() -> Node {
        Node::Leaf {
            value: LeafValue::Class {
                prediction: 1,
                distribution: vec![0.2, 0.8],
            },
            impurity: Impurity::new(0.32),
            n_samples: 10,
        }
    }

    fn split() -> Node {
        Node::Split {
            feature: FeatureIndex::new(2),
            threshold: 3.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.48),
            n_samples: 20,
            impurity_decrease: 0.16,
        }
    }

    #[test]
    fn indices_display_and_order() {
        assert_eq!(FeatureIndex::new(3).to_string(), "3");
        assert_eq!(NodeIndex::new(7).index(), 7);
        assert!(FeatureIndex::new(1) < FeatureIndex::new(5));
    }

    #[test]
    fn impurity_display() {
        assert_eq!(Impurity::new(0.333333).to_string(), "0.333333");
    }

    #[test]
    fn leaf_and_split_accessors() {
        assert!(class_leaf().is_leaf());
        assert!(!split().is_leaf());
        assert_eq!(class_leaf().n_samples(), 10);
        assert_eq!(split().n_samples(), 20);
        assert!((split().impurity().value() - 0.48).abs() < f64::EPSILON);
    }

    #[test]
    fn regression_leaf_holds_mean() {
        let leaf = Node::Leaf {
            value: LeafValue::Mean(2.5),
            impurity: Impurity::new(0.0),
            n_samples: 4,
        };
        let Node::Leaf {
            value: LeafValue::Mean(m),
            ..
        } = leaf
        else {
            panic!("expected a regression leaf");
        };
        assert!((m - 2.5).abs() < f64::EPSILON);
    }
}
