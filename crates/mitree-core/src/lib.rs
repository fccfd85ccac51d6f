//! Meta induction trees.
//!
//! A random forest is trained, every tree is flattened into its root-to-leaf
//! rules, each rule is scored from its contingency table, and the weighted
//! rules become a synthetic meta dataset. A single C4.5-style tree trained on
//! that meta dataset is the explainable substitute for the forest.
//!
//! The learners sit behind [`ForestLearner`] and [`TreeLearner`]; the
//! implementations from `mitree-learn` are provided in [`adapters`].

pub mod adapters;
mod catalog;
mod config;
mod contingency;
mod error;
mod eval;
mod extract;
mod meta;
mod pipeline;
mod rule;
mod strategy;
mod table;
mod traits;

pub use catalog::{AttributeCatalog, AttributeSummary};
pub use config::MitConfig;
pub use contingency::{ClassTotals, ContingencyMatrix, RuleMetrics};
pub use error::{ConfigurationError, ContractViolation, DegenerateRule, MitError};
pub use eval::{FoldScores, MitCrossValidation, MitEvaluation};
pub use extract::RuleExtractor;
pub use meta::{Exclusion, ExclusionReason, MetaBatch, MetaDatasetBuilder, MetaRow, ScoredRule};
pub use pipeline::{InductionReport, MetaInductionPipeline, MitModel, TreeAnalysis, TreeSummary};
pub use rule::{Comparison, Condition, DecisionRule};
pub use strategy::{NumericStrategy, WeightStrategy};
pub use table::{render_decision_table, render_rules};
pub use traits::{ExplainableModel, ForestLearner, InspectTree, LeafDistribution, SplitKind, TreeLearner, TreeNode};
