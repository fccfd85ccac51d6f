//! Random forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::dataset::{Dataset, Header, Value};
use crate::error::LearnError;
use crate::node::argmax;
use crate::random_tree::{RandomTreeConfig, default_k_attributes};
use crate::split::Bag;
use crate::tree::DecisionTree;

/// Strategy for determining the number of attributes examined at each node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// `floor(log2(n_attributes)) + 1`.
    Log2Plus1,
    /// Square root of the attribute count, rounded up.
    Sqrt,
    /// A fixed count.
    Fixed(usize),
    /// All attributes (bagged trees without attribute subsampling).
    All,
}

/// Configuration for random forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default      |
/// |----------------------|--------------|
/// | `max_features`       | `Log2Plus1`  |
/// | `max_depth`          | `None`       |
/// | `min_leaf_weight`    | 1.0          |
/// | `bootstrap_fraction` | 1.0          |
/// | `seed`               | 1            |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_leaf_weight: f64,
    pub(crate) bootstrap_fraction: f64,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, LearnError> {
        if n_trees == 0 {
            return Err(LearnError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Log2Plus1,
            max_depth: None,
            min_leaf_weight: 1.0,
            bootstrap_fraction: 1.0,
            seed: 1,
        })
    }

    /// Set the attribute subsampling strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum depth of every tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum branch weight of every split.
    #[must_use]
    pub fn with_min_leaf_weight(mut self, min_leaf_weight: f64) -> Self {
        self.min_leaf_weight = min_leaf_weight;
        self
    }

    /// Set the bootstrap sample size as a fraction of the training weight.
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Set the master seed from which per-tree seeds are drawn.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the attribute subsampling strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum branch weight.
    #[must_use]
    pub fn min_leaf_weight(&self) -> f64 {
        self.min_leaf_weight
    }

    /// Return the bootstrap fraction.
    #[must_use]
    pub fn bootstrap_fraction(&self) -> f64 {
        self.bootstrap_fraction
    }

    /// Return the master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train the forest.
    ///
    /// Each tree sees a bootstrap sample drawn with replacement; repeated
    /// draws of an instance add up in its bag weight. Trees are trained in
    /// parallel with per-tree seeds drawn from one master RNG, so the
    /// result does not depend on the thread count.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LearnError::EmptyDataset`] | `data` has no instances |
    /// | [`LearnError::InvalidMaxFeatures`] | subset size resolves outside `[1, n_attributes]` |
    /// | [`LearnError::InvalidBootstrapFraction`] | fraction outside (0, 1] |
    /// | [`LearnError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`LearnError::InvalidMinLeafWeight`] | negative or non-finite minimum |
    #[instrument(skip_all, fields(n_trees = self.n_trees, n_instances = data.len()))]
    pub fn fit(&self, data: &Dataset) -> Result<RandomForest, LearnError> {
        data.require_instances()?;
        let n_instances = data.len();
        let n_attributes = data.header().n_attributes();

        if self.bootstrap_fraction <= 0.0 || self.bootstrap_fraction > 1.0 {
            return Err(LearnError::InvalidBootstrapFraction {
                fraction: self.bootstrap_fraction,
            });
        }
        let k = resolve_max_features(self.max_features, n_attributes)?;
        let template = RandomTreeConfig::new()
            .with_k_attributes(Some(k))
            .with_max_depth(self.max_depth)
            .with_min_leaf_weight(self.min_leaf_weight);
        template.validate(n_attributes)?;

        let draw_count = ((n_instances as f64) * self.bootstrap_fraction).ceil() as usize;

        info!(
            n_trees = self.n_trees,
            n_instances,
            n_attributes,
            n_classes = data.header().n_classes(),
            k_attributes = k,
            draw_count,
            "training random forest"
        );

        // Generate per-tree seeds from master RNG.
        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| master_rng.r#gen()).collect();

        let trees: Vec<DecisionTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bag = bootstrap_bag(data, draw_count, &mut rng);
                template
                    .clone()
                    .with_seed(rng.r#gen())
                    .grow(data, &bag, k)
            })
            .collect();

        debug!(n_trees_trained = trees.len(), "tree training complete");

        Ok(RandomForest {
            trees,
            header: data.header().clone(),
        })
    }
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_attributes: usize,
) -> Result<usize, LearnError> {
    let resolved = match max_features {
        MaxFeatures::Log2Plus1 => default_k_attributes(n_attributes),
        MaxFeatures::Sqrt => (n_attributes as f64).sqrt().ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_attributes,
    };
    if resolved == 0 || resolved > n_attributes {
        return Err(LearnError::InvalidMaxFeatures {
            max_features: resolved,
            n_attributes,
        });
    }
    Ok(resolved)
}

/// Draw a bootstrap sample as a weighted bag; duplicates add their weights.
fn bootstrap_bag(data: &Dataset, draw_count: usize, rng: &mut impl Rng) -> Bag {
    let n_instances = data.len();
    let mut draws = vec![0usize; n_instances];
    for _ in 0..draw_count {
        draws[rng.gen_range(0..n_instances)] += 1;
    }
    draws
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n > 0)
        .map(|(i, &n)| (i, n as f64 * data.instances()[i].weight()))
        .collect()
}

/// A fitted random forest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) header: Header,
}

impl RandomForest {
    /// Return the trained trees in seed order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Consume the forest and return its trees.
    #[must_use]
    pub fn into_trees(self) -> Vec<DecisionTree> {
        self.trees
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Average of the per-tree class probability distributions.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::PredictionValueMismatch`] on a wrong-length row.
    pub fn distribution_for(&self, values: &[Value]) -> Result<Vec<f64>, LearnError> {
        let mut sum = vec![0.0; self.header.n_classes()];
        for tree in &self.trees {
            for (s, p) in sum.iter_mut().zip(tree.distribution_for(values)?) {
                *s += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }

    /// Predict the class index for one row.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::PredictionValueMismatch`] on a wrong-length row.
    pub fn classify(&self, values: &[Value]) -> Result<usize, LearnError> {
        self.distribution_for(values).map(|p| argmax(&p))
    }

    /// Predict every instance of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::PredictionValueMismatch`] on a schema mismatch.
    pub fn classify_dataset(&self, data: &Dataset) -> Result<Vec<usize>, LearnError> {
        data.instances()
            .iter()
            .map(|instance| self.classify(instance.values()))
            .collect()
    }
}
