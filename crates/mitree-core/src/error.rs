use mitree_learn::LearnError;

use crate::traits::SplitKind;

/// Errors from the meta induction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MitError {
    /// Invalid pipeline configuration; raised before any data is touched.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Returned when every extracted rule was filtered out.
    #[error("meta training set is empty: all {n_rules} rules from {n_trees} trees were filtered out")]
    EmptyTrainingSet {
        /// Number of trees the forest produced.
        n_trees: usize,
        /// Number of rules extracted across all trees.
        n_rules: usize,
    },

    /// A tree or rule broke an assumption the pipeline relies on.
    #[error("contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    /// Wraps an error from a tree or forest learner.
    #[error("learner error: {0}")]
    Learner(#[from] LearnError),
}

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Returned when the forest size is zero.
    #[error("forest size must be at least 1, got {forest_size}")]
    InvalidForestSize {
        /// The invalid forest size.
        forest_size: usize,
    },

    /// Returned when the pruning options do not validate.
    #[error("invalid pruning parameters: {0}")]
    InvalidPruning(#[source] LearnError),

    /// Returned when a strategy code or name is not recognised.
    #[error("unknown {kind} strategy \"{code}\"")]
    UnknownStrategy {
        /// Which strategy family was being parsed ("numeric" or "weight").
        kind: &'static str,
        /// The unrecognised input.
        code: String,
    },

    /// Returned when the novelty scale is negative or not finite.
    #[error("novelty scale must be finite and > 0, got {novelty_scale}")]
    InvalidNoveltyScale {
        /// The invalid scale.
        novelty_scale: f64,
    },
}

/// Programmer errors: a tree or rule that cannot belong to the dataset at hand.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractViolation {
    /// A split or condition names an attribute the dataset does not declare.
    #[error("unknown attribute \"{attribute}\"")]
    UnknownAttribute {
        /// The attribute name.
        attribute: String,
    },

    /// A numeric attribute has no catalog summary (no known values).
    #[error("no summary for numeric attribute \"{attribute}\"")]
    MissingSummary {
        /// The attribute name.
        attribute: String,
    },

    /// A node's split kind differs from the declared kind of its attribute.
    #[error("attribute \"{attribute}\" is split as {reported} but declared {declared}")]
    SplitKindMismatch {
        /// The attribute name.
        attribute: String,
        /// Kind declared by the dataset.
        declared: SplitKind,
        /// Kind reported by the tree node.
        reported: SplitKind,
    },

    /// A nominal split has a branch count different from the label count.
    #[error("nominal split on \"{attribute}\" has {got} branches, expected {expected}")]
    NominalArityMismatch {
        /// The attribute name.
        attribute: String,
        /// Number of nominal labels.
        expected: usize,
        /// Number of branches reported.
        got: usize,
    },

    /// A numeric split without exactly two branches.
    #[error("numeric split on \"{attribute}\" has {got} branches, expected 2")]
    NumericArityMismatch {
        /// The attribute name.
        attribute: String,
        /// Number of branches reported.
        got: usize,
    },

    /// A binary split without exactly two branches.
    #[error("binary split on \"{attribute}\" has {got} branches, expected 2")]
    BinaryArityMismatch {
        /// The attribute name.
        attribute: String,
        /// Number of branches reported.
        got: usize,
    },

    /// A binary split that reports no tested label.
    #[error("binary split on \"{attribute}\" has no tested label")]
    MissingSplitValue {
        /// The attribute name.
        attribute: String,
    },

    /// A numeric split that reports no threshold.
    #[error("numeric split on \"{attribute}\" has no threshold")]
    MissingThreshold {
        /// The attribute name.
        attribute: String,
    },

    /// An interior node that reports no split attribute.
    #[error("interior node has no split attribute")]
    MissingSplitAttribute,

    /// A leaf distribution whose length differs from the class count.
    #[error("leaf distribution has {got} entries, expected {expected} classes")]
    ClassCountMismatch {
        /// Number of classes in the dataset.
        expected: usize,
        /// Length of the reported distribution.
        got: usize,
    },

    /// A rule predicts a class label the dataset does not declare.
    #[error("unknown class label \"{label}\"")]
    UnknownClass {
        /// The label.
        label: String,
    },

    /// A nominal condition names a label its attribute does not declare.
    #[error("attribute \"{attribute}\" has no label \"{value}\"")]
    UnknownNominalValue {
        /// The attribute name.
        attribute: String,
        /// The label.
        value: String,
    },
}

/// Why a rule metric is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, thiserror::Error)]
pub enum DegenerateRule {
    /// The rule covers no weight (`l == 0`).
    #[error("rule covers no weight")]
    ZeroSupport,
    /// No negative instances exist for the rule (`b + d == 0`).
    #[error("rule has no negative instances")]
    NoNegatives,
}
