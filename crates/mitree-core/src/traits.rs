//! Capabilities the pipeline consumes: forest and tree learners, and a
//! read-only view of a trained tree's nodes.

use std::fmt;

use mitree_learn::{Dataset, PruneConfig, Value};

use crate::error::MitError;

/// How an interior node tests its attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SplitKind {
    /// One branch per nominal label, in label order.
    Nominal,
    /// Two branches: `value < threshold`, then `value >= threshold`.
    Numeric,
    /// Two branches on a nominal attribute: the tested label, then every
    /// other label.
    Binary,
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitKind::Nominal => write!(f, "nominal"),
            SplitKind::Numeric => write!(f, "numeric"),
            SplitKind::Binary => write!(f, "binary"),
        }
    }
}

/// What a leaf knows about the training weight that reached it.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafDistribution {
    /// Weighted class counts, indexed like the dataset's class labels.
    Classification(Vec<f64>),
    /// Numeric-class leaf.
    Regression {
        /// Mean class value at the leaf.
        mean: f64,
        /// Training weight at the leaf.
        weight: f64,
        /// Summed error of the leaf's training instances.
        error_sum: f64,
    },
}

/// Read-only view of one node in a trained tree.
pub trait TreeNode: Sized {
    /// Whether the node is a leaf.
    fn is_leaf(&self) -> bool;

    /// Name of the attribute tested here; `None` on leaves.
    fn split_attribute(&self) -> Option<&str>;

    /// Kind of test applied here; `None` on leaves.
    fn split_kind(&self) -> Option<SplitKind>;

    /// Threshold of a numeric split.
    fn split_threshold(&self) -> Option<f64>;

    /// Label tested by a binary split.
    fn split_value(&self) -> Option<&str> {
        None
    }

    /// Child nodes in branch order; empty on leaves.
    fn children(&self) -> Vec<Self>;

    /// Training distribution of a leaf; `None` when the leaf saw nothing.
    fn class_distribution(&self) -> Option<LeafDistribution>;
}

/// A trained tree whose nodes can be walked from the root.
pub trait InspectTree {
    /// Node view borrowing from the tree.
    type Node<'a>: TreeNode
    where
        Self: 'a;

    fn root(&self) -> Self::Node<'_>;
}

/// Builds independent randomized trees.
pub trait ForestLearner {
    type Tree: InspectTree + Send + Sync;

    /// Train `n_trees` trees on `data`.
    ///
    /// # Errors
    ///
    /// Learner-specific; usually [`MitError::Learner`].
    fn build(&self, data: &Dataset, n_trees: usize) -> Result<Vec<Self::Tree>, MitError>;
}

/// Builds a single, possibly pruned, decision tree.
pub trait TreeLearner {
    type Model: ExplainableModel;

    /// Train one tree on `data` with the given pruning options.
    ///
    /// # Errors
    ///
    /// Learner-specific; usually [`MitError::Learner`].
    fn build(&self, data: &Dataset, prune: &PruneConfig) -> Result<Self::Model, MitError>;
}

/// The final model: classifies rows and explains itself.
pub trait ExplainableModel {
    /// Predict the class index of one row of predictor values.
    ///
    /// # Errors
    ///
    /// Model-specific; usually a wrong-length row.
    fn classify(&self, values: &[Value]) -> Result<usize, MitError>;

    fn leaf_count(&self) -> usize;

    fn node_count(&self) -> usize;

    /// Text rendering with leaf weights divided by `weight_divisor`.
    fn render_text(&self, weight_divisor: f64) -> String;

    /// Graphviz rendering with leaf weights divided by `weight_divisor`.
    fn render_dot(&self, weight_divisor: f64) -> String;
}
