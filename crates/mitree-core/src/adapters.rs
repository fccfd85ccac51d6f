//! Trait implementations backed by `mitree-learn`.

use mitree_learn::{
    Dataset, DecisionTree, MaxFeatures, Node, NodeIndex, PruneConfig, RandomForestConfig, Value,
};
use tracing::{debug, instrument};

use crate::{
    error::MitError,
    traits::{
        ExplainableModel, ForestLearner, InspectTree, LeafDistribution, SplitKind, TreeLearner,
        TreeNode,
    },
};

/// Node view into an arena [`DecisionTree`].
#[derive(Debug, Clone, Copy)]
pub struct ArenaNode<'a> {
    tree: &'a DecisionTree,
    index: NodeIndex,
}

impl ArenaNode<'_> {
    fn node(&self) -> &Node {
        self.tree.node(self.index)
    }
}

impl TreeNode for ArenaNode<'_> {
    fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    fn split_attribute(&self) -> Option<&str> {
        self.node()
            .attribute()
            .map(|a| self.tree.header().attribute(a.index()).name())
    }

    fn split_kind(&self) -> Option<SplitKind> {
        match self.node() {
            Node::Leaf { .. } => None,
            Node::NumericSplit { .. } => Some(SplitKind::Numeric),
            Node::NominalSplit { .. } => Some(SplitKind::Nominal),
            Node::BinarySplit { .. } => Some(SplitKind::Binary),
        }
    }

    fn split_value(&self) -> Option<&str> {
        match self.node() {
            Node::BinarySplit {
                attribute, value, ..
            } => self
                .tree
                .header()
                .attribute(attribute.index())
                .values()
                .get(*value)
                .map(String::as_str),
            _ => None,
        }
    }

    fn split_threshold(&self) -> Option<f64> {
        match self.node() {
            Node::NumericSplit { threshold, .. } => Some(*threshold),
            _ => None,
        }
    }

    fn children(&self) -> Vec<Self> {
        self.node()
            .children()
            .into_iter()
            .map(|index| ArenaNode {
                tree: self.tree,
                index,
            })
            .collect()
    }

    fn class_distribution(&self) -> Option<LeafDistribution> {
        let node = self.node();
        if !node.is_leaf() || node.weight() <= 0.0 {
            return None;
        }
        Some(LeafDistribution::Classification(node.distribution().to_vec()))
    }
}

impl InspectTree for DecisionTree {
    type Node<'a>
        = ArenaNode<'a>
    where
        Self: 'a;

    fn root(&self) -> ArenaNode<'_> {
        ArenaNode {
            tree: self,
            index: NodeIndex::ROOT,
        }
    }
}

/// [`ForestLearner`] training a bagged forest of random trees.
///
/// # Defaults
///
/// | Parameter      | Default     |
/// |----------------|-------------|
/// | `max_features` | `Log2Plus1` |
/// | `max_depth`    | `None`      |
/// | `seed`         | 1           |
#[derive(Debug, Clone)]
pub struct RandomForestLearner {
    max_features: MaxFeatures,
    max_depth: Option<usize>,
    seed: u64,
}

impl RandomForestLearner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_features: MaxFeatures::Log2Plus1,
            max_depth: None,
            seed: 1,
        }
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Forest configuration for `n_trees` trees.
    ///
    /// # Errors
    ///
    /// Returns [`MitError::Learner`] when `n_trees` is zero.
    pub fn forest_config(&self, n_trees: usize) -> Result<RandomForestConfig, MitError> {
        Ok(RandomForestConfig::new(n_trees)?
            .with_max_features(self.max_features)
            .with_max_depth(self.max_depth)
            .with_seed(self.seed))
    }
}

impl Default for RandomForestLearner {
    fn default() -> Self {
        Self::new()
    }
}

impl ForestLearner for RandomForestLearner {
    type Tree = DecisionTree;

    #[instrument(skip_all, fields(n_trees = n_trees, seed = self.seed))]
    fn build(&self, data: &Dataset, n_trees: usize) -> Result<Vec<DecisionTree>, MitError> {
        let forest = self.forest_config(n_trees)?.fit(data)?;
        debug!(n_trees = forest.n_trees(), "forest ready");
        Ok(forest.into_trees())
    }
}

/// [`TreeLearner`] growing a C4.5-style tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct C45Learner;

impl TreeLearner for C45Learner {
    type Model = DecisionTree;

    fn build(&self, data: &Dataset, prune: &PruneConfig) -> Result<DecisionTree, MitError> {
        Ok(prune.fit(data)?)
    }
}

impl ExplainableModel for DecisionTree {
    fn classify(&self, values: &[Value]) -> Result<usize, MitError> {
        Ok(DecisionTree::classify(self, values)?)
    }

    fn leaf_count(&self) -> usize {
        self.n_leaves()
    }

    fn node_count(&self) -> usize {
        self.n_nodes()
    }

    fn render_text(&self, weight_divisor: f64) -> String {
        self.to_text(weight_divisor)
    }

    fn render_dot(&self, weight_divisor: f64) -> String {
        self.to_dot(weight_divisor)
    }
}
