use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    LearnError,
    dataset::Dataset,
    node::{AttributeIndex, Node, NodeIndex},
    split::{Bag, Candidate, MIN_WEIGHT, Test, class_counts, evaluate, partition},
    tree::DecisionTree,
};

/// Configuration for a single randomized decision tree.
///
/// At every node a random subset of attributes is examined and the split
/// with the highest information gain among them is taken. Nominal
/// attributes split into one branch per label; numeric attributes split
/// in two at a midpoint, `value < threshold` going left.
///
/// Construct via [`RandomTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default                         |
/// |-------------------|---------------------------------|
/// | `k_attributes`    | `None` (`log2(n_attributes) + 1`) |
/// | `max_depth`       | `None` (unlimited)              |
/// | `min_leaf_weight` | 1.0                             |
/// | `seed`            | 42                              |
#[derive(Debug, Clone)]
pub struct RandomTreeConfig {
    pub(crate) k_attributes: Option<usize>,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_leaf_weight: f64,
    pub(crate) seed: u64,
}

impl RandomTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            k_attributes: None,
            max_depth: None,
            min_leaf_weight: 1.0,
            seed: 42,
        }
    }

    /// Set the number of attributes examined per node.
    ///
    /// `None` means `floor(log2(n_attributes)) + 1`.
    #[must_use]
    pub fn with_k_attributes(mut self, k_attributes: Option<usize>) -> Self {
        self.k_attributes = k_attributes;
        self
    }

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum total weight required in at least two branches of a split.
    #[must_use]
    pub fn with_min_leaf_weight(mut self, min_leaf_weight: f64) -> Self {
        self.min_leaf_weight = min_leaf_weight;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the attribute subset size, if set.
    #[must_use]
    pub fn k_attributes(&self) -> Option<usize> {
        self.k_attributes
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum leaf weight.
    #[must_use]
    pub fn min_leaf_weight(&self) -> f64 {
        self.min_leaf_weight
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a randomized tree on every instance of `data`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`LearnError::EmptyDataset`] | `data` has no instances |
    /// | [`LearnError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`LearnError::InvalidMinLeafWeight`] | negative or non-finite minimum |
    /// | [`LearnError::InvalidMaxFeatures`] | `k_attributes` outside `[1, n_attributes]` |
    #[instrument(skip(self, data), fields(n_instances = data.len()))]
    pub fn fit(&self, data: &Dataset) -> Result<DecisionTree, LearnError> {
        data.require_instances()?;
        let k = self.validate(data.header().n_attributes())?;
        let bag: Bag = data
            .instances()
            .iter()
            .enumerate()
            .map(|(i, instance)| (i, instance.weight()))
            .collect();
        Ok(self.grow(data, &bag, k))
    }

    /// Check the settings and resolve the attribute subset size.
    pub(crate) fn validate(&self, n_attributes: usize) -> Result<usize, LearnError> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(LearnError::InvalidMaxDepth { max_depth: 0 });
        }
        if !self.min_leaf_weight.is_finite() || self.min_leaf_weight < 0.0 {
            return Err(LearnError::InvalidMinLeafWeight {
                min_leaf_weight: self.min_leaf_weight,
            });
        }
        let k = self
            .k_attributes
            .unwrap_or_else(|| default_k_attributes(n_attributes));
        if k == 0 || k > n_attributes {
            return Err(LearnError::InvalidMaxFeatures {
                max_features: k,
                n_attributes,
            });
        }
        Ok(k)
    }

    /// Grow a tree over a pre-validated weighted bag.
    pub(crate) fn grow(&self, data: &Dataset, bag: &[(usize, f64)], k: usize) -> DecisionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();
        let mut order: Vec<usize> = (0..data.header().n_attributes()).collect();

        let root = build_tree(data, bag, self, k, 0, &mut rng, &mut order, &mut arena);

        debug!(
            root_index = root.index(),
            n_nodes = arena.len(),
            "random tree built"
        );

        DecisionTree {
            nodes: arena,
            header: data.header().clone(),
        }
    }
}

impl Default for RandomTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `floor(log2(n)) + 1`, the usual attribute subset size for random trees.
pub(crate) fn default_k_attributes(n_attributes: usize) -> usize {
    if n_attributes == 0 {
        return 0;
    }
    ((n_attributes as f64).log2().floor() as usize + 1).min(n_attributes)
}

/// Recursively build the arena-based randomized tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
#[allow(clippy::too_many_arguments)]
fn build_tree(
    data: &Dataset,
    bag: &[(usize, f64)],
    config: &RandomTreeConfig,
    k: usize,
    depth: usize,
    rng: &mut ChaCha8Rng,
    order: &mut Vec<usize>,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let distribution = class_counts(data, bag);
    let total: f64 = distribution.iter().sum();

    let make_leaf = |arena: &mut Vec<Node>, distribution: Vec<f64>| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf { distribution });
        NodeIndex::new(idx)
    };

    // Stopping conditions → leaf.
    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_light = total < 2.0 * config.min_leaf_weight || total <= MIN_WEIGHT;
    let pure = distribution.iter().filter(|&&c| c > 0.0).count() <= 1;
    if too_light || pure || depth_exceeded {
        return make_leaf(arena, distribution);
    }

    // Examine attributes in random order: at least k of them, and keep
    // going until one yields a positive gain.
    order.shuffle(rng);
    let mut best: Option<Candidate> = None;
    for (examined, &attribute) in order.iter().enumerate() {
        if examined >= k && best.is_some() {
            break;
        }
        if let Some(candidate) = evaluate(data, bag, attribute, false, config.min_leaf_weight)
            && candidate.gain > 1e-10
            && best.is_none_or(|b| candidate.gain > b.gain)
        {
            best = Some(candidate);
        }
    }

    let Some(split) = best else {
        return make_leaf(arena, distribution);
    };

    let branches = partition(data, bag, split.attribute, split.test);

    // Arena pattern: reserve index, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        distribution: distribution.clone(),
    });

    let children: Vec<NodeIndex> = branches
        .iter()
        .map(|branch| build_tree(data, branch, config, k, depth + 1, rng, order, arena))
        .collect();

    let attribute = AttributeIndex::new(split.attribute);
    arena[node_idx] = match split.test {
        Test::Numeric { threshold } => Node::NumericSplit {
            attribute,
            threshold,
            left: children[0],
            right: children[1],
            distribution,
        },
        Test::Nominal | Test::Binary { .. } => Node::NominalSplit {
            attribute,
            children,
            distribution,
        },
    };

    NodeIndex::new(node_idx)
}
