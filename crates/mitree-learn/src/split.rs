//! Split evaluation over weighted instance bags.
//!
//! A bag is a list of `(instance index, weight)` pairs into a [`Dataset`].
//! Bootstrap duplicates and fractional copies of instances with a missing
//! test value are both expressed through the weight, so the dataset itself
//! is never copied while a tree grows.

use crate::dataset::{Dataset, Value};

/// `(instance index, weight)` pairs selecting part of a dataset.
pub(crate) type Bag = Vec<(usize, f64)>;

/// Weight below which a branch or bag is considered empty.
pub(crate) const MIN_WEIGHT: f64 = 1e-6;

/// Test applied at an interior node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Test {
    /// `value < threshold` is branch 0, everything else branch 1.
    Numeric { threshold: f64 },
    /// One branch per nominal label.
    Nominal,
    /// `value == label` is branch 0, every other label branch 1.
    Binary { value: usize },
}

impl Test {
    pub(crate) fn n_branches(self, n_values: usize) -> usize {
        match self {
            Test::Numeric { .. } | Test::Binary { .. } => 2,
            Test::Nominal => n_values,
        }
    }

    /// Branch taken by `value`; `None` when the value is missing.
    pub(crate) fn branch_of(self, value: Value) -> Option<usize> {
        match (self, value) {
            (_, Value::Missing) => None,
            (Test::Numeric { threshold }, Value::Numeric(v)) => {
                Some(if v < threshold { 0 } else { 1 })
            }
            (Test::Nominal, Value::Nominal(i)) => Some(i),
            (Test::Binary { value: label }, Value::Nominal(i)) => {
                Some(if i == label { 0 } else { 1 })
            }
            _ => None,
        }
    }
}

/// A scored candidate split.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub(crate) attribute: usize,
    pub(crate) test: Test,
    /// Information gain scaled by the fraction of known values.
    pub(crate) gain: f64,
    pub(crate) gain_ratio: f64,
}

/// Weighted class counts of a bag.
pub(crate) fn class_counts(data: &Dataset, bag: &[(usize, f64)]) -> Vec<f64> {
    let mut counts = vec![0.0; data.header().n_classes()];
    for &(i, w) in bag {
        counts[data.instances()[i].class] += w;
    }
    counts
}

/// Entropy in bits of a weighted class distribution.
pub(crate) fn entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            p * p.log2()
        })
        .sum::<f64>()
}

/// `-p log2 p` with the `0 log 0 = 0` convention.
fn info_term(p: f64) -> f64 {
    if p > 0.0 { -p * p.log2() } else { 0.0 }
}

/// Gain and gain ratio from per-branch class counts of the known-valued part.
fn score(
    branch_counts: &[Vec<f64>],
    known_weight: f64,
    total_weight: f64,
) -> (f64, f64) {
    let mut known_counts = vec![0.0; branch_counts.first().map_or(0, Vec::len)];
    for counts in branch_counts {
        for (k, c) in known_counts.iter_mut().zip(counts) {
            *k += c;
        }
    }
    let after: f64 = branch_counts
        .iter()
        .map(|counts| {
            let w: f64 = counts.iter().sum();
            w / known_weight * entropy(counts)
        })
        .sum();
    let gain = known_weight / total_weight * (entropy(&known_counts) - after);

    let missing = (total_weight - known_weight).max(0.0);
    let split_info = branch_counts
        .iter()
        .map(|counts| info_term(counts.iter().sum::<f64>() / total_weight))
        .sum::<f64>()
        + info_term(missing / total_weight);
    let gain_ratio = if split_info > MIN_WEIGHT {
        gain / split_info
    } else {
        0.0
    };
    (gain, gain_ratio)
}

/// Evaluate the best split of `attribute` over `bag`.
///
/// Numeric attributes are cut at the midpoint between consecutive distinct
/// values; nominal attributes split multiway, or on the best single label
/// when `binary` is set. At least two branches must carry `min_leaf` weight.
/// Returns `None` when no admissible split exists.
pub(crate) fn evaluate(
    data: &Dataset,
    bag: &[(usize, f64)],
    attribute: usize,
    binary: bool,
    min_leaf: f64,
) -> Option<Candidate> {
    let total_weight: f64 = bag.iter().map(|&(_, w)| w).sum();
    if total_weight <= MIN_WEIGHT {
        return None;
    }
    let attr = data.header().attribute(attribute);
    if attr.is_numeric() {
        evaluate_numeric(data, bag, attribute, min_leaf, total_weight)
    } else if binary && attr.n_values() > 2 {
        (0..attr.n_values())
            .filter_map(|label| {
                evaluate_test(
                    data,
                    bag,
                    attribute,
                    Test::Binary { value: label },
                    2,
                    min_leaf,
                    total_weight,
                )
            })
            .fold(None, |best: Option<Candidate>, c| match best {
                Some(b) if b.gain >= c.gain => Some(b),
                _ => Some(c),
            })
    } else {
        evaluate_test(
            data,
            bag,
            attribute,
            Test::Nominal,
            attr.n_values(),
            min_leaf,
            total_weight,
        )
    }
}

fn evaluate_test(
    data: &Dataset,
    bag: &[(usize, f64)],
    attribute: usize,
    test: Test,
    n_branches: usize,
    min_leaf: f64,
    total_weight: f64,
) -> Option<Candidate> {
    let n_classes = data.header().n_classes();
    let mut branch_counts = vec![vec![0.0; n_classes]; n_branches];
    let mut known_weight = 0.0;
    for &(i, w) in bag {
        let instance = &data.instances()[i];
        if let Some(b) = test.branch_of(instance.value(attribute)) {
            branch_counts[b][instance.class] += w;
            known_weight += w;
        }
    }
    if known_weight <= MIN_WEIGHT {
        return None;
    }
    let populated = branch_counts
        .iter()
        .filter(|c| c.iter().sum::<f64>() >= min_leaf)
        .count();
    if populated < 2 {
        return None;
    }
    let (gain, gain_ratio) = score(&branch_counts, known_weight, total_weight);
    Some(Candidate {
        attribute,
        test,
        gain,
        gain_ratio,
    })
}

fn evaluate_numeric(
    data: &Dataset,
    bag: &[(usize, f64)],
    attribute: usize,
    min_leaf: f64,
    total_weight: f64,
) -> Option<Candidate> {
    let n_classes = data.header().n_classes();
    let mut known: Vec<(f64, usize, f64)> = bag
        .iter()
        .filter_map(|&(i, w)| {
            let instance = &data.instances()[i];
            instance
                .value(attribute)
                .as_numeric()
                .map(|v| (v, instance.class, w))
        })
        .collect();
    if known.len() < 2 {
        return None;
    }
    known.sort_by(|a, b| a.0.total_cmp(&b.0));

    let known_weight: f64 = known.iter().map(|k| k.2).sum();
    if known_weight <= MIN_WEIGHT {
        return None;
    }
    let mut left = vec![0.0; n_classes];
    let mut right = vec![0.0; n_classes];
    for &(_, class, w) in &known {
        right[class] += w;
    }

    let mut left_weight = 0.0;
    let mut best: Option<(f64, f64, f64)> = None; // (gain, gain_ratio, threshold)
    for pair in known.windows(2) {
        let (value, class, w) = pair[0];
        let next = pair[1].0;
        left[class] += w;
        right[class] -= w;
        left_weight += w;
        if value >= next {
            continue;
        }
        let right_weight = known_weight - left_weight;
        if left_weight < min_leaf || right_weight < min_leaf {
            continue;
        }
        let branches = [left.clone(), right.clone()];
        let (gain, gain_ratio) = score(&branches, known_weight, total_weight);
        if best.is_none_or(|(g, _, _)| gain > g) {
            let mut threshold = (value + next) / 2.0;
            if threshold <= value {
                threshold = next;
            }
            best = Some((gain, gain_ratio, threshold));
        }
    }

    best.map(|(gain, gain_ratio, threshold)| Candidate {
        attribute,
        test: Test::Numeric { threshold },
        gain,
        gain_ratio,
    })
}

/// Split `bag` by `test` on `attribute`.
///
/// Instances with a missing test value are copied into every branch with
/// their weight scaled by the branch's share of the known weight.
pub(crate) fn partition(
    data: &Dataset,
    bag: &[(usize, f64)],
    attribute: usize,
    test: Test,
) -> Vec<Bag> {
    let n_branches = test.n_branches(data.header().attribute(attribute).n_values());
    let mut branches: Vec<Bag> = vec![Vec::new(); n_branches];
    let mut branch_weights = vec![0.0; n_branches];
    let mut missing = Vec::new();
    for &(i, w) in bag {
        match test.branch_of(data.instances()[i].value(attribute)) {
            Some(b) => {
                branches[b].push((i, w));
                branch_weights[b] += w;
            }
            None => missing.push((i, w)),
        }
    }
    let known: f64 = branch_weights.iter().sum();
    if !missing.is_empty() {
        for (b, branch) in branches.iter_mut().enumerate() {
            let share = if known > 0.0 {
                branch_weights[b] / known
            } else {
                1.0 / n_branches as f64
            };
            if share > 0.0 {
                branch.extend(missing.iter().map(|&(i, w)| (i, w * share)));
            }
        }
    }
    branches
}
