use std::path::PathBuf;

/// Errors from dataset construction, tree learning and model persistence.
#[derive(Debug, thiserror::Error)]
pub enum LearnError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when the minimum leaf weight is negative or not finite.
    #[error("min_leaf_weight must be finite and >= 0, got {min_leaf_weight}")]
    InvalidMinLeafWeight {
        /// The invalid minimum leaf weight.
        min_leaf_weight: f64,
    },

    /// Returned when max_features resolves to 0 or exceeds n_attributes.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_attributes}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of attributes in the dataset.
        n_attributes: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when an unpruned tree is combined with reduced-error pruning.
    #[error("an unpruned tree cannot use reduced-error pruning")]
    UnprunedWithReducedErrorPruning,

    /// Returned when subtree raising is switched off for an unpruned tree.
    #[error("subtree raising only applies to pruned trees; leave it enabled when unpruned")]
    UnprunedWithoutSubtreeRaising,

    /// Returned when the pruning confidence factor is outside (0, 1).
    #[error("confidence_factor must be in (0, 1), got {confidence_factor}")]
    InvalidConfidenceFactor {
        /// The invalid confidence factor.
        confidence_factor: f64,
    },

    /// Returned when reduced-error pruning is asked for fewer than 2 folds.
    #[error("reduced-error pruning needs at least 2 folds, got {folds}")]
    InvalidPruningFolds {
        /// The invalid fold count.
        folds: usize,
    },

    /// Returned when the minimum number of instances per leaf is zero.
    #[error("min_leaf_instances must be at least 1, got {min_leaf_instances}")]
    InvalidMinLeafInstances {
        /// The invalid minimum.
        min_leaf_instances: usize,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when a learner receives a dataset with no instances.
    #[error("dataset \"{relation}\" has no instances")]
    EmptyDataset {
        /// Relation name of the empty dataset.
        relation: String,
    },

    /// Returned when a dataset is declared without any predictor attribute.
    #[error("dataset has zero predictor attributes")]
    ZeroAttributes,

    /// Returned when two attributes share a name.
    #[error("duplicate attribute name \"{name}\"")]
    DuplicateAttribute {
        /// The duplicated name.
        name: String,
    },

    /// Returned when the class attribute is numeric or has no labels.
    #[error("class attribute \"{name}\" must be nominal with at least one label")]
    InvalidClassAttribute {
        /// Name of the class attribute.
        name: String,
    },

    /// Returned when an instance has a different number of values than the header.
    #[error("instance {instance_index} has {got} values, expected {expected}")]
    ValueCountMismatch {
        /// The expected number of values.
        expected: usize,
        /// The actual number of values.
        got: usize,
        /// The zero-based index the instance would have taken.
        instance_index: usize,
    },

    /// Returned when a value does not fit the kind or label range of its attribute.
    #[error("instance {instance_index}: value for attribute \"{attribute}\" does not fit its declaration")]
    ValueKindMismatch {
        /// The zero-based index the instance would have taken.
        instance_index: usize,
        /// Name of the attribute.
        attribute: String,
    },

    /// Returned when a numeric value is NaN or infinite.
    #[error("non-finite value at instance {instance_index}, attribute \"{attribute}\"")]
    NonFiniteValue {
        /// The zero-based index the instance would have taken.
        instance_index: usize,
        /// Name of the attribute.
        attribute: String,
    },

    /// Returned when an instance's class index is outside the class label set.
    #[error("instance {instance_index} has class index {class}, but only {n_classes} labels exist")]
    UnknownClass {
        /// The zero-based index the instance would have taken.
        instance_index: usize,
        /// The offending class index.
        class: usize,
        /// Number of declared class labels.
        n_classes: usize,
    },

    /// Returned when an instance weight is negative or not finite.
    #[error("instance {instance_index} has invalid weight {weight}")]
    InvalidWeight {
        /// The zero-based index the instance would have taken.
        instance_index: usize,
        /// The offending weight.
        weight: f64,
    },

    /// Returned when a class has fewer instances than the number of folds.
    #[error("class {class} has only {count} instances, need at least {n_folds} for stratified folds")]
    TooFewInstancesForFolds {
        /// The class index with insufficient instances.
        class: usize,
        /// The number of instances belonging to that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when a value row at prediction time has the wrong length.
    #[error("prediction input has {got} values, expected {expected}")]
    PredictionValueMismatch {
        /// The expected number of values.
        expected: usize,
        /// The actual number of values.
        got: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
