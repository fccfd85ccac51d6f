//! Stratified fold assignment.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::dataset::Dataset;
use crate::error::LearnError;

/// Assign every instance of `data` to one of `n_folds` folds.
///
/// Groups instances by class, shuffles within each class, then
/// round-robins across folds so each fold gets approximately equal
/// representation of each class.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`LearnError::InvalidFoldCount`] | `n_folds` < 2 |
/// | [`LearnError::EmptyDataset`] | `data` has no instances |
/// | [`LearnError::TooFewInstancesForFolds`] | a present class has fewer instances than folds |
pub fn stratified_folds(data: &Dataset, n_folds: usize, seed: u64) -> Result<Vec<usize>, LearnError> {
    if n_folds < 2 {
        return Err(LearnError::InvalidFoldCount { n_folds });
    }
    data.require_instances()?;
    let by_class = group_by_class(data);
    for (class, indices) in by_class.iter().enumerate() {
        if !indices.is_empty() && indices.len() < n_folds {
            return Err(LearnError::TooFewInstancesForFolds {
                class,
                count: indices.len(),
                n_folds,
            });
        }
    }
    Ok(assign(by_class, data.len(), n_folds, seed))
}

/// Like [`stratified_folds`] but tolerates classes smaller than the fold count.
pub(crate) fn loose_folds(data: &Dataset, n_folds: usize, seed: u64) -> Vec<usize> {
    assign(group_by_class(data), data.len(), n_folds.max(1), seed)
}

fn group_by_class(data: &Dataset) -> Vec<Vec<usize>> {
    let mut by_class: Vec<Vec<usize>> = vec![vec![]; data.header().n_classes()];
    for (i, instance) in data.instances().iter().enumerate() {
        by_class[instance.class()].push(i);
    }
    by_class
}

fn assign(mut by_class: Vec<Vec<usize>>, n_instances: usize, n_folds: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut fold_assignments = vec![0usize; n_instances];
    // Continue the round-robin across classes so small classes do not all land in fold 0.
    let mut next = 0usize;
    for indices in &mut by_class {
        indices.shuffle(&mut rng);
        for &idx in indices.iter() {
            fold_assignments[idx] = next % n_folds;
            next += 1;
        }
    }
    fold_assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Attribute, Header, Instance, Value};

    fn data(per_class: &[usize]) -> Dataset {
        let header = Header::new(
            "f",
            vec![Attribute::numeric("x")],
            Attribute::nominal("c", vec!["a".into(), "b".into()]),
        )
        .unwrap();
        let mut ds = Dataset::new(header);
        for (class, &n) in per_class.iter().enumerate() {
            for i in 0..n {
                ds.push(Instance::new(vec![Value::Numeric(i as f64)], class, 1.0))
                    .unwrap();
            }
        }
        ds
    }

    #[test]
    fn folds_are_balanced_per_class() {
        let ds = data(&[10, 10]);
        let folds = stratified_folds(&ds, 5, 42).unwrap();
        for fold in 0..5 {
            let in_fold: Vec<usize> = (0..ds.len()).filter(|&i| folds[i] == fold).collect();
            assert_eq!(in_fold.len(), 4);
            let class_b = in_fold.iter().filter(|&&i| ds.instances()[i].class() == 1).count();
            assert_eq!(class_b, 2);
        }
    }

    #[test]
    fn too_few_instances_error() {
        let ds = data(&[10, 2]);
        let err = stratified_folds(&ds, 3, 1).unwrap_err();
        assert!(matches!(
            err,
            LearnError::TooFewInstancesForFolds { class: 1, count: 2, n_folds: 3 }
        ));
    }

    #[test]
    fn single_fold_error() {
        assert!(matches!(
            stratified_folds(&data(&[3, 3]), 1, 1).unwrap_err(),
            LearnError::InvalidFoldCount { n_folds: 1 }
        ));
    }

    #[test]
    fn loose_folds_accept_small_classes() {
        let folds = loose_folds(&data(&[4, 1]), 3, 7);
        assert_eq!(folds.len(), 5);
        assert!(folds.iter().all(|&f| f < 3));
    }

    #[test]
    fn deterministic_for_seed() {
        let ds = data(&[7, 8]);
        assert_eq!(
            stratified_folds(&ds, 3, 11).unwrap(),
            stratified_folds(&ds, 3, 11).unwrap()
        );
    }
}
