//! C4.5-style decision trees: gain-ratio growth, collapsing, pessimistic
//! pruning with subtree raising, and reduced-error pruning.

use tracing::{debug, info, instrument};

use crate::{
    LearnError,
    dataset::Dataset,
    folds::loose_folds,
    node::{AttributeIndex, Node, NodeIndex, argmax},
    split::{Bag, Candidate, MIN_WEIGHT, Test, class_counts, evaluate, partition},
    tree::DecisionTree,
};

/// Pruning options for a C4.5-style tree, and the learner that honours them.
///
/// Construct via [`PruneConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter               | Default |
/// |-------------------------|---------|
/// | `unpruned`              | false   |
/// | `confidence_factor`     | 0.25    |
/// | `min_leaf_instances`    | 2       |
/// | `reduced_error_pruning` | false   |
/// | `folds`                 | 3       |
/// | `seed`                  | 1       |
/// | `binary_splits`         | false   |
/// | `subtree_raising`       | true    |
/// | `collapse_tree`         | true    |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PruneConfig {
    pub(crate) unpruned: bool,
    pub(crate) confidence_factor: f64,
    pub(crate) min_leaf_instances: usize,
    pub(crate) reduced_error_pruning: bool,
    pub(crate) folds: usize,
    pub(crate) seed: u64,
    pub(crate) binary_splits: bool,
    pub(crate) subtree_raising: bool,
    pub(crate) collapse_tree: bool,
}

impl PruneConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            unpruned: false,
            confidence_factor: 0.25,
            min_leaf_instances: 2,
            reduced_error_pruning: false,
            folds: 3,
            seed: 1,
            binary_splits: false,
            subtree_raising: true,
            collapse_tree: true,
        }
    }

    /// Skip pruning entirely.
    #[must_use]
    pub fn with_unpruned(mut self, unpruned: bool) -> Self {
        self.unpruned = unpruned;
        self
    }

    /// Set the confidence factor of pessimistic pruning (smaller prunes more).
    #[must_use]
    pub fn with_confidence_factor(mut self, confidence_factor: f64) -> Self {
        self.confidence_factor = confidence_factor;
        self
    }

    /// Set the minimum weight that at least two branches of a split must carry.
    #[must_use]
    pub fn with_min_leaf_instances(mut self, min_leaf_instances: usize) -> Self {
        self.min_leaf_instances = min_leaf_instances;
        self
    }

    /// Prune against a held-out fold instead of the pessimistic estimate.
    #[must_use]
    pub fn with_reduced_error_pruning(mut self, reduced_error_pruning: bool) -> Self {
        self.reduced_error_pruning = reduced_error_pruning;
        self
    }

    /// Set the fold count for reduced-error pruning; one fold is held out.
    #[must_use]
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Set the seed used to shuffle the reduced-error pruning folds.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Split nominal attributes on a single label instead of multiway.
    #[must_use]
    pub fn with_binary_splits(mut self, binary_splits: bool) -> Self {
        self.binary_splits = binary_splits;
        self
    }

    /// Allow replacing a node by its largest branch during pruning.
    #[must_use]
    pub fn with_subtree_raising(mut self, subtree_raising: bool) -> Self {
        self.subtree_raising = subtree_raising;
        self
    }

    /// Collapse subtrees that do not reduce training error.
    #[must_use]
    pub fn with_collapse_tree(mut self, collapse_tree: bool) -> Self {
        self.collapse_tree = collapse_tree;
        self
    }

    // --- Getters ---

    #[must_use]
    pub fn unpruned(&self) -> bool {
        self.unpruned
    }

    #[must_use]
    pub fn confidence_factor(&self) -> f64 {
        self.confidence_factor
    }

    #[must_use]
    pub fn min_leaf_instances(&self) -> usize {
        self.min_leaf_instances
    }

    #[must_use]
    pub fn reduced_error_pruning(&self) -> bool {
        self.reduced_error_pruning
    }

    #[must_use]
    pub fn folds(&self) -> usize {
        self.folds
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn binary_splits(&self) -> bool {
        self.binary_splits
    }

    #[must_use]
    pub fn subtree_raising(&self) -> bool {
        self.subtree_raising
    }

    #[must_use]
    pub fn collapse_tree(&self) -> bool {
        self.collapse_tree
    }

    /// Check that the options form a coherent pruning setup.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LearnError::UnprunedWithReducedErrorPruning`] | both `unpruned` and `reduced_error_pruning` |
    /// | [`LearnError::UnprunedWithoutSubtreeRaising`] | `unpruned` with subtree raising switched off |
    /// | [`LearnError::InvalidConfidenceFactor`] | confidence factor outside (0, 1) |
    /// | [`LearnError::InvalidPruningFolds`] | reduced-error pruning with fewer than 2 folds |
    /// | [`LearnError::InvalidMinLeafInstances`] | `min_leaf_instances` is zero |
    pub fn validate(&self) -> Result<(), LearnError> {
        if self.unpruned && self.reduced_error_pruning {
            return Err(LearnError::UnprunedWithReducedErrorPruning);
        }
        if self.unpruned && !self.subtree_raising {
            return Err(LearnError::UnprunedWithoutSubtreeRaising);
        }
        if !(self.confidence_factor > 0.0 && self.confidence_factor < 1.0) {
            return Err(LearnError::InvalidConfidenceFactor {
                confidence_factor: self.confidence_factor,
            });
        }
        if self.reduced_error_pruning && self.folds < 2 {
            return Err(LearnError::InvalidPruningFolds { folds: self.folds });
        }
        if self.min_leaf_instances == 0 {
            return Err(LearnError::InvalidMinLeafInstances {
                min_leaf_instances: 0,
            });
        }
        Ok(())
    }

    /// Grow and prune a tree on `data`.
    ///
    /// # Errors
    ///
    /// Any [`PruneConfig::validate`] error, or [`LearnError::EmptyDataset`]
    /// when `data` has no instances.
    #[instrument(skip_all, fields(n_instances = data.len(), unpruned = self.unpruned, rep = self.reduced_error_pruning))]
    pub fn fit(&self, data: &Dataset) -> Result<DecisionTree, LearnError> {
        self.validate()?;
        data.require_instances()?;

        let all: Bag = data
            .instances()
            .iter()
            .enumerate()
            .map(|(i, instance)| (i, instance.weight()))
            .collect();

        let grown = if self.reduced_error_pruning {
            let folds = loose_folds(data, self.folds, self.seed);
            let holdout_fold = self.folds - 1;
            let (grow_bag, holdout): (Bag, Bag) =
                all.iter().partition(|&&(i, _)| folds[i] != holdout_fold);
            let mut tree = self.grow(data, &grow_bag);
            if self.collapse_tree {
                tree = collapse(tree);
            }
            debug!(
                grow_weight = bag_weight(&grow_bag),
                holdout_weight = bag_weight(&holdout),
                "reduced-error pruning"
            );
            prune_reduced_error(tree, data, &holdout)
        } else {
            let mut tree = self.grow(data, &all);
            if self.collapse_tree {
                tree = collapse(tree);
            }
            if self.unpruned {
                tree
            } else {
                self.prune_pessimistic(tree, data, &all)
            }
        };

        let mut arena = Vec::new();
        flatten(&grown, &mut arena);
        let tree = DecisionTree {
            nodes: arena,
            header: data.header().clone(),
        };
        info!(
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            "pruned tree built"
        );
        Ok(tree)
    }

    fn grow(&self, data: &Dataset, bag: &[(usize, f64)]) -> Grown {
        let distribution = class_counts(data, bag);
        let total: f64 = distribution.iter().sum();
        let min_leaf = self.min_leaf_instances as f64;
        let max = distribution.get(argmax(&distribution)).copied().unwrap_or(0.0);

        if total < 2.0 * min_leaf || total - max <= MIN_WEIGHT {
            return Grown::Leaf { distribution };
        }

        let n_classes = data.header().n_classes().max(1) as f64;
        let min_split = (0.1 * total / n_classes).clamp(min_leaf, 25.0);

        let candidates: Vec<Candidate> = (0..data.header().n_attributes())
            .filter_map(|a| evaluate(data, bag, a, self.binary_splits, min_split))
            .filter(|c| c.gain > 1e-10)
            .collect();
        if candidates.is_empty() {
            return Grown::Leaf { distribution };
        }

        // Best gain ratio among the candidates with at least average gain.
        let average_gain = candidates.iter().map(|c| c.gain).sum::<f64>() / candidates.len() as f64;
        let mut best: Option<Candidate> = None;
        for candidate in candidates.iter().filter(|c| c.gain >= average_gain - 1e-3) {
            if best.is_none_or(|b| candidate.gain_ratio > b.gain_ratio) {
                best = Some(*candidate);
            }
        }
        let Some(split) = best else {
            return Grown::Leaf { distribution };
        };

        let children = partition(data, bag, split.attribute, split.test)
            .iter()
            .map(|branch| self.grow(data, branch))
            .collect();

        Grown::Split {
            attribute: split.attribute,
            test: split.test,
            children,
            distribution,
        }
    }

    fn prune_pessimistic(&self, node: Grown, data: &Dataset, bag: &[(usize, f64)]) -> Grown {
        let distribution = class_counts(data, bag);
        let Grown::Split {
            attribute,
            test,
            children,
            ..
        } = node
        else {
            return Grown::Leaf { distribution };
        };

        let cf = self.confidence_factor;
        let branches = partition(data, bag, attribute, test);
        let children: Vec<Grown> = children
            .into_iter()
            .zip(&branches)
            .map(|(child, branch)| self.prune_pessimistic(child, data, branch))
            .collect();

        let largest = (0..children.len())
            .max_by(|&a, &b| children[a].weight().total_cmp(&children[b].weight()))
            .unwrap_or(0);
        let errors_largest = if self.subtree_raising && !children.is_empty() {
            estimated_errors_for(&children[largest], data, bag, cf)
        } else {
            f64::INFINITY
        };
        let errors_leaf = estimated_leaf_errors(&distribution, cf);
        let node = Grown::Split {
            attribute,
            test,
            children,
            distribution,
        };
        let errors_tree = estimated_errors(&node, cf);

        if errors_leaf <= errors_tree + 0.1 && errors_leaf <= errors_largest + 0.1 {
            let Grown::Split { distribution, .. } = node else {
                return node;
            };
            return Grown::Leaf { distribution };
        }
        if errors_largest <= errors_tree + 0.1 {
            let Grown::Split { mut children, .. } = node else {
                return node;
            };
            let raised = children.swap_remove(largest);
            return self.prune_pessimistic(raised, data, bag);
        }
        node
    }
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned tree used while growing and pruning; flattened into an arena at the end.
#[derive(Debug, Clone)]
enum Grown {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        attribute: usize,
        test: Test,
        children: Vec<Grown>,
        distribution: Vec<f64>,
    },
}

impl Grown {
    fn distribution(&self) -> &[f64] {
        match self {
            Grown::Leaf { distribution } | Grown::Split { distribution, .. } => distribution,
        }
    }

    fn weight(&self) -> f64 {
        self.distribution().iter().sum()
    }

    fn training_errors(&self) -> f64 {
        match self {
            Grown::Leaf { distribution } => leaf_errors(distribution),
            Grown::Split { children, .. } => children.iter().map(Grown::training_errors).sum(),
        }
    }
}

fn bag_weight(bag: &[(usize, f64)]) -> f64 {
    bag.iter().map(|b| b.1).sum()
}

/// Weight not belonging to the majority class.
fn leaf_errors(distribution: &[f64]) -> f64 {
    let total: f64 = distribution.iter().sum();
    total - distribution.get(argmax(distribution)).copied().unwrap_or(0.0)
}

/// Replace subtrees that do not lower the training error by leaves.
fn collapse(node: Grown) -> Grown {
    match node {
        Grown::Leaf { .. } => node,
        Grown::Split {
            attribute,
            test,
            children,
            distribution,
        } => {
            let subtree_errors: f64 = children.iter().map(Grown::training_errors).sum();
            if subtree_errors >= leaf_errors(&distribution) - 1e-3 {
                Grown::Leaf { distribution }
            } else {
                Grown::Split {
                    attribute,
                    test,
                    children: children.into_iter().map(collapse).collect(),
                    distribution,
                }
            }
        }
    }
}

/// Estimated errors of a leaf holding `distribution`.
fn estimated_leaf_errors(distribution: &[f64], cf: f64) -> f64 {
    let total: f64 = distribution.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let errors = leaf_errors(distribution);
    errors + add_errs(total, errors, cf)
}

/// Estimated errors of a subtree over the distributions stored in it.
fn estimated_errors(node: &Grown, cf: f64) -> f64 {
    match node {
        Grown::Leaf { distribution } => estimated_leaf_errors(distribution, cf),
        Grown::Split { children, .. } => children.iter().map(|c| estimated_errors(c, cf)).sum(),
    }
}

/// Estimated errors of a subtree if `bag` were routed through it.
fn estimated_errors_for(node: &Grown, data: &Dataset, bag: &[(usize, f64)], cf: f64) -> f64 {
    match node {
        Grown::Leaf { .. } => estimated_leaf_errors(&class_counts(data, bag), cf),
        Grown::Split {
            attribute,
            test,
            children,
            ..
        } => partition(data, bag, *attribute, *test)
            .iter()
            .zip(children)
            .map(|(branch, child)| estimated_errors_for(child, data, branch, cf))
            .sum(),
    }
}

/// Bottom-up reduced-error pruning against the held-out `holdout` bag.
fn prune_reduced_error(node: Grown, data: &Dataset, holdout: &[(usize, f64)]) -> Grown {
    let Grown::Split {
        attribute,
        test,
        children,
        distribution,
    } = node
    else {
        return node;
    };
    let branches = partition(data, holdout, attribute, test);
    let children: Vec<Grown> = children
        .into_iter()
        .zip(&branches)
        .map(|(child, branch)| prune_reduced_error(child, data, branch))
        .collect();
    let node = Grown::Split {
        attribute,
        test,
        children,
        distribution,
    };
    let errors_tree = holdout_errors(&node, data, holdout);
    let class = argmax(node.distribution());
    let errors_leaf: f64 = holdout
        .iter()
        .filter(|&&(i, _)| data.instances()[i].class() != class)
        .map(|&(_, w)| w)
        .sum();
    if errors_leaf <= errors_tree + 1e-10 {
        let Grown::Split { distribution, .. } = node else {
            return node;
        };
        return Grown::Leaf { distribution };
    }
    node
}

fn holdout_errors(node: &Grown, data: &Dataset, bag: &[(usize, f64)]) -> f64 {
    match node {
        Grown::Leaf { distribution } => {
            let class = argmax(distribution);
            bag.iter()
                .filter(|&&(i, _)| data.instances()[i].class() != class)
                .map(|&(_, w)| w)
                .sum()
        }
        Grown::Split {
            attribute,
            test,
            children,
            ..
        } => partition(data, bag, *attribute, *test)
            .iter()
            .zip(children)
            .map(|(branch, child)| holdout_errors(child, data, branch))
            .sum(),
    }
}

/// Write `node` into `arena` and return its index.
fn flatten(node: &Grown, arena: &mut Vec<Node>) -> NodeIndex {
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        distribution: node.distribution().to_vec(),
    });
    let Grown::Split {
        attribute,
        test,
        children,
        distribution,
    } = node
    else {
        return NodeIndex::new(node_idx);
    };

    let indices: Vec<NodeIndex> = children.iter().map(|c| flatten(c, arena)).collect();
    let attribute = AttributeIndex::new(*attribute);
    let distribution = distribution.clone();
    arena[node_idx] = match *test {
        Test::Numeric { threshold } => Node::NumericSplit {
            attribute,
            threshold,
            left: indices[0],
            right: indices[1],
            distribution,
        },
        Test::Binary { value } => Node::BinarySplit {
            attribute,
            value,
            left: indices[0],
            right: indices[1],
            distribution,
        },
        Test::Nominal => Node::NominalSplit {
            attribute,
            children: indices,
            distribution,
        },
    };
    NodeIndex::new(node_idx)
}

/// Extra errors expected at a leaf with `n` instances and `e` training errors
/// under the upper confidence limit `cf` of the binomial error rate.
pub(crate) fn add_errs(n: f64, e: f64, cf: f64) -> f64 {
    if n <= 0.0 || cf > 0.5 {
        return 0.0;
    }
    if e < 1.0 {
        let base = n * (1.0 - cf.powf(1.0 / n));
        if e == 0.0 {
            return base;
        }
        return base + e * (add_errs(n, 1.0, cf) - base);
    }
    if e + 0.5 >= n {
        return (n - e).max(0.0);
    }
    let z = normal_inverse(1.0 - cf);
    let f = (e + 0.5) / n;
    let r = (f + z * z / (2.0 * n) + z * (f / n - f * f / n + z * z / (4.0 * n * n)).sqrt())
        / (1.0 + z * z / n);
    r * n - e
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
pub(crate) fn normal_inverse(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
