//! Stratified k-fold cross-validation of the whole pipeline, with the
//! underlying forest scored on the same folds for comparison.
//!
//! Each fold trains one forest; the meta induction tree of that fold is
//! induced from it.

use mitree_learn::{ConfusionMatrix, Dataset, LearnError, stratified_folds};
use tracing::{info, instrument};

use crate::{config::MitConfig, error::MitError};

/// Cross-validation configuration.
///
/// Construct via [`MitCrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct MitCrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Accuracy of one learner across the folds.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FoldScores {
    pub fold_accuracies: Vec<f64>,
    pub mean_accuracy: f64,
    pub std_accuracy: f64,
    /// Summed over all folds.
    pub confusion_matrix: ConfusionMatrix,
}

impl FoldScores {
    fn from_folds(fold_accuracies: Vec<f64>, confusion_matrix: ConfusionMatrix) -> Self {
        let n = fold_accuracies.len() as f64;
        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / n;
        let variance = fold_accuracies
            .iter()
            .map(|&a| (a - mean_accuracy).powi(2))
            .sum::<f64>()
            / n;
        Self {
            fold_accuracies,
            mean_accuracy,
            std_accuracy: variance.sqrt(),
            confusion_matrix,
        }
    }
}

/// Results of [`MitCrossValidation::evaluate`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct MitEvaluation {
    /// The meta induction tree.
    pub tree: FoldScores,
    /// The forest it was induced from.
    pub forest: FoldScores,
    pub mean_leaf_count: f64,
    pub mean_node_count: f64,
    pub n_folds: usize,
    pub n_instances: usize,
}

impl MitCrossValidation {
    /// # Errors
    ///
    /// Returns [`LearnError::InvalidFoldCount`] (as [`MitError::Learner`])
    /// if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, MitError> {
        if n_folds < 2 {
            return Err(LearnError::InvalidFoldCount { n_folds }.into());
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Seed for fold assignment; fold `k` also trains with `seed + k`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train and score on every fold.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MitError::Learner`] | empty dataset, a class with fewer instances than folds, or a learner failure |
    /// | Other pipeline errors | from [`MitConfig::fit_with_forest`] on a training fold |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_instances = data.len()))]
    pub fn evaluate(&self, config: &MitConfig, data: &Dataset) -> Result<MitEvaluation, MitError> {
        config.validate()?;
        let assignments = stratified_folds(data, self.n_folds, self.seed)?;
        let class_names = data.header().class_values().to_vec();

        let mut tree_accuracies = Vec::with_capacity(self.n_folds);
        let mut forest_accuracies = Vec::with_capacity(self.n_folds);
        let mut tree_confusion = ConfusionMatrix::new(class_names.clone());
        let mut forest_confusion = ConfusionMatrix::new(class_names);
        let mut leaf_total = 0usize;
        let mut node_total = 0usize;

        for fold in 0..self.n_folds {
            let (train, test): (Vec<usize>, Vec<usize>) =
                (0..data.len()).partition(|&i| assignments[i] != fold);
            let train = data.select(&train);
            let test = data.select(&test);

            let fold_config = config
                .clone()
                .with_seed(config.seed().wrapping_add(fold as u64));
            let forest = fold_config
                .forest_learner()
                .forest_config(fold_config.forest_size())?
                .fit(&train)?;
            let predicted = forest.classify_dataset(&test)?;
            let forest_fold = ConfusionMatrix::from_predictions(&test, &predicted)?;
            forest_accuracies.push(forest_fold.accuracy());
            forest_confusion.merge(&forest_fold);

            // The tree is induced from the same forest that was just scored.
            let model = fold_config.fit_with_forest(&train, &forest)?;
            let predicted = model.model().classify_dataset(&test)?;
            let confusion = ConfusionMatrix::from_predictions(&test, &predicted)?;
            tree_accuracies.push(confusion.accuracy());
            tree_confusion.merge(&confusion);
            leaf_total += model.report().leaf_count;
            node_total += model.report().node_count;

            info!(
                fold,
                tree_accuracy = confusion.accuracy(),
                forest_accuracy = forest_fold.accuracy(),
                "fold completed"
            );
        }

        let tree = FoldScores::from_folds(tree_accuracies, tree_confusion);
        let forest = FoldScores::from_folds(forest_accuracies, forest_confusion);
        info!(
            tree_accuracy = tree.mean_accuracy,
            forest_accuracy = forest.mean_accuracy,
            "cross-validation complete"
        );

        Ok(MitEvaluation {
            tree,
            forest,
            mean_leaf_count: leaf_total as f64 / self.n_folds as f64,
            mean_node_count: node_total as f64 / self.n_folds as f64,
            n_folds: self.n_folds,
            n_instances: data.len(),
        })
    }
}
