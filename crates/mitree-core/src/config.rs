//! Options of a meta induction run.

use mitree_learn::{Dataset, DecisionTree, MaxFeatures, PruneConfig, RandomForest};

use crate::{
    adapters::{C45Learner, RandomForestLearner},
    error::{ConfigurationError, MitError},
    pipeline::{MetaInductionPipeline, MitModel},
    strategy::{NumericStrategy, WeightStrategy},
};

/// Configuration for a meta induction run.
///
/// Construct via [`MitConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `forest_size`       | 15                    |
/// | `numeric`           | `Interval`            |
/// | `weight`            | `Precision`           |
/// | `novelty_scale`     | 1.0                   |
/// | `prune`             | [`PruneConfig::new`]  |
/// | `seed`              | 1                     |
/// | `max_features`      | `Log2Plus1`           |
/// | `max_depth`         | `None`                |
/// | `parallel`          | true                  |
/// | `keep_meta_dataset` | false                 |
/// | `keep_rules`        | false                 |
#[derive(Debug, Clone)]
pub struct MitConfig {
    forest_size: usize,
    numeric: NumericStrategy,
    weight: WeightStrategy,
    novelty_scale: f64,
    prune: PruneConfig,
    seed: u64,
    max_features: MaxFeatures,
    max_depth: Option<usize>,
    parallel: bool,
    keep_meta_dataset: bool,
    keep_rules: bool,
}

impl MitConfig {
    /// Create a configuration with the defaults above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            forest_size: 15,
            numeric: NumericStrategy::Interval,
            weight: WeightStrategy::Precision,
            novelty_scale: 1.0,
            prune: PruneConfig::new(),
            seed: 1,
            max_features: MaxFeatures::Log2Plus1,
            max_depth: None,
            parallel: true,
            keep_meta_dataset: false,
            keep_rules: false,
        }
    }

    /// Number of random trees to decompose. Checked by [`Self::validate`].
    #[must_use]
    pub fn with_forest_size(mut self, forest_size: usize) -> Self {
        self.forest_size = forest_size;
        self
    }

    /// How numeric intervals turn into meta-dataset values.
    #[must_use]
    pub fn with_numeric_strategy(mut self, numeric: NumericStrategy) -> Self {
        self.numeric = numeric;
        self
    }

    /// Rule quality used to weight meta-dataset rows.
    #[must_use]
    pub fn with_weight_strategy(mut self, weight: WeightStrategy) -> Self {
        self.weight = weight;
        self
    }

    /// Extra factor applied to novelty-weighted rows.
    #[must_use]
    pub fn with_novelty_scale(mut self, novelty_scale: f64) -> Self {
        self.novelty_scale = novelty_scale;
        self
    }

    /// Options for the final tree, passed through unchanged.
    #[must_use]
    pub fn with_prune(mut self, prune: PruneConfig) -> Self {
        self.prune = prune;
        self
    }

    /// Seed of the forest learner.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Attributes sampled at each forest node.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Depth limit of the forest trees; `None` grows them fully.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Extract and score trees on the rayon pool.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Return the meta dataset alongside the model.
    #[must_use]
    pub fn with_keep_meta_dataset(mut self, keep_meta_dataset: bool) -> Self {
        self.keep_meta_dataset = keep_meta_dataset;
        self
    }

    /// Return the scored rules of every tree alongside the model.
    #[must_use]
    pub fn with_keep_rules(mut self, keep_rules: bool) -> Self {
        self.keep_rules = keep_rules;
        self
    }

    // --- Getters ---

    /// Number of random trees to decompose.
    #[must_use]
    pub fn forest_size(&self) -> usize {
        self.forest_size
    }

    /// How numeric intervals turn into meta-dataset values.
    #[must_use]
    pub fn numeric_strategy(&self) -> NumericStrategy {
        self.numeric
    }

    /// Rule quality used to weight meta-dataset rows.
    #[must_use]
    pub fn weight_strategy(&self) -> WeightStrategy {
        self.weight
    }

    /// Extra factor applied to novelty-weighted rows.
    #[must_use]
    pub fn novelty_scale(&self) -> f64 {
        self.novelty_scale
    }

    /// Options for the final tree.
    #[must_use]
    pub fn prune(&self) -> &PruneConfig {
        &self.prune
    }

    /// Seed of the forest learner.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Attributes sampled at each forest node.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Depth limit of the forest trees.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Whether trees are extracted and scored on the rayon pool.
    #[must_use]
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Whether the meta dataset is returned with the model.
    #[must_use]
    pub fn keep_meta_dataset(&self) -> bool {
        self.keep_meta_dataset
    }

    /// Whether the scored rules are returned with the model.
    #[must_use]
    pub fn keep_rules(&self) -> bool {
        self.keep_rules
    }

    /// Check every option before any data is touched.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ConfigurationError::InvalidForestSize`] | `forest_size` is zero |
    /// | [`ConfigurationError::InvalidPruning`] | the prune config does not validate |
    /// | [`ConfigurationError::InvalidNoveltyScale`] | `novelty_scale` not finite or `<= 0` |
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.forest_size == 0 {
            return Err(ConfigurationError::InvalidForestSize {
                forest_size: self.forest_size,
            });
        }
        self.prune
            .validate()
            .map_err(ConfigurationError::InvalidPruning)?;
        if !(self.novelty_scale.is_finite() && self.novelty_scale > 0.0) {
            return Err(ConfigurationError::InvalidNoveltyScale {
                novelty_scale: self.novelty_scale,
            });
        }
        Ok(())
    }

    /// Forest learner matching this configuration.
    #[must_use]
    pub fn forest_learner(&self) -> RandomForestLearner {
        RandomForestLearner::new()
            .with_max_features(self.max_features)
            .with_max_depth(self.max_depth)
            .with_seed(self.seed)
    }

    /// Run the full pipeline with a random forest and a C4.5-style final tree.
    ///
    /// # Errors
    ///
    /// See [`MetaInductionPipeline::run`].
    pub fn fit(&self, data: &Dataset) -> Result<MitModel<DecisionTree>, MitError> {
        MetaInductionPipeline::new(self.clone(), self.forest_learner(), C45Learner).run(data)
    }

    /// Decompose `forest`, already trained on `data`, into a C4.5-style tree.
    ///
    /// # Errors
    ///
    /// See [`MetaInductionPipeline::run_on_trees`].
    pub fn fit_with_forest(
        &self,
        data: &Dataset,
        forest: &RandomForest,
    ) -> Result<MitModel<DecisionTree>, MitError> {
        MetaInductionPipeline::new(self.clone(), self.forest_learner(), C45Learner)
            .run_on_trees(data, forest.trees())
    }
}

impl Default for MitConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MitConfig::new();
        assert_eq!(config.forest_size(), 15);
        assert_eq!(config.numeric_strategy(), NumericStrategy::Interval);
        assert_eq!(config.weight_strategy(), WeightStrategy::Precision);
        assert_eq!(config.novelty_scale(), 1.0);
        assert_eq!(config.prune(), &PruneConfig::new());
        assert_eq!(config.seed(), 1);
        assert_eq!(config.max_features(), MaxFeatures::Log2Plus1);
        assert_eq!(config.max_depth(), None);
        assert!(config.parallel());
        assert!(!config.keep_meta_dataset());
        assert!(!config.keep_rules());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_forest_rejected() {
        let err = MitConfig::new().with_forest_size(0).validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidForestSize { forest_size: 0 }));
    }

    #[test]
    fn bad_prune_options_rejected() {
        let prune = PruneConfig::new()
            .with_unpruned(true)
            .with_reduced_error_pruning(true);
        let err = MitConfig::new().with_prune(prune).validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPruning(_)));
    }

    #[test]
    fn bad_novelty_scale_rejected() {
        for scale in [0.0, -1.0, f64::NAN] {
            let err = MitConfig::new().with_novelty_scale(scale).validate().unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidNoveltyScale { .. }));
        }
    }
}
