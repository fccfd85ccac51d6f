//! Tree learners for meta induction: dataset model, random trees, random
//! forests and C4.5-style pruned trees.
//!
//! Trees are stored as index arenas over weighted class distributions, so
//! the same [`DecisionTree`] type serves both the randomized ensemble
//! members and the final pruned tree. Missing values are handled
//! fractionally during growth and prediction.

mod confusion;
mod dataset;
mod error;
mod folds;
mod forest;
mod node;
mod prune;
mod random_tree;
mod render;
mod serialize;
mod split;
mod tree;

pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use dataset::{Attribute, AttributeKind, Dataset, Header, Instance, Value};
pub use error::LearnError;
pub use folds::stratified_folds;
pub use forest::{MaxFeatures, RandomForest, RandomForestConfig};
pub use node::{AttributeIndex, Node, NodeIndex};
pub use prune::PruneConfig;
pub use random_tree::RandomTreeConfig;
pub use tree::DecisionTree;
