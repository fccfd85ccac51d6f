//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::dataset::Dataset;
use crate::error::LearnError;

/// A weighted confusion matrix for multi-class classification.
///
/// Entry `matrix[actual][predicted]` sums the weight of instances with
/// class `actual` that were predicted as `predicted`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConfusionMatrix {
    class_names: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class label.
    pub class: String,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true instances of this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Weight of true instances in this class.
    pub support: f64,
}

impl ConfusionMatrix {
    /// Create an empty matrix over `class_names`.
    #[must_use]
    pub fn new(class_names: Vec<String>) -> Self {
        let n = class_names.len();
        Self {
            class_names,
            matrix: vec![vec![0.0; n]; n],
        }
    }

    /// Build a matrix from the instances of `data` and one predicted class each.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LearnError::EmptyDataset`] | `data` has no instances |
    /// | [`LearnError::PredictionValueMismatch`] | `predicted.len() != data.len()` |
    pub fn from_predictions(data: &Dataset, predicted: &[usize]) -> Result<Self, LearnError> {
        data.require_instances()?;
        if predicted.len() != data.len() {
            return Err(LearnError::PredictionValueMismatch {
                expected: data.len(),
                got: predicted.len(),
            });
        }
        let mut cm = Self::new(data.header().class_values().to_vec());
        for (instance, &p) in data.instances().iter().zip(predicted) {
            cm.record(instance.class(), p, instance.weight());
        }
        Ok(cm)
    }

    /// Add `weight` to cell `(actual, predicted)`; out-of-range classes are ignored.
    pub fn record(&mut self, actual: usize, predicted: usize, weight: f64) {
        if let Some(cell) = self
            .matrix
            .get_mut(actual)
            .and_then(|row| row.get_mut(predicted))
        {
            *cell += weight;
        }
    }

    /// Add every cell of `other` into `self`.
    ///
    /// Matrices over different class sets are left untouched.
    pub fn merge(&mut self, other: &ConfusionMatrix) {
        if self.class_names != other.class_names {
            return;
        }
        for (row, other_row) in self.matrix.iter_mut().zip(&other.matrix) {
            for (cell, v) in row.iter_mut().zip(other_row) {
                *cell += v;
            }
        }
    }

    /// Total weight recorded.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.matrix.iter().flatten().sum()
    }

    /// Overall accuracy: weighted proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: f64 = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0.0 { 0.0 } else { correct / total }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.n_classes();
        (0..n)
            .map(|c| {
                let tp = self.matrix[c][c];
                let fp: f64 = (0..n).filter(|&i| i != c).map(|i| self.matrix[i][c]).sum();
                let fn_: f64 = (0..n).filter(|&j| j != c).map(|j| self.matrix[c][j]).sum();
                let support = tp + fn_;
                let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
                let recall = if support == 0.0 { 0.0 } else { tp / support };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: self.class_names[c].clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<f64>] {
        &self.matrix
    }

    /// Return the class labels, in row order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .class_names
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8);

        write!(f, "{:>width$}", "")?;
        for name in &self.class_names {
            write!(f, " {name:>width$}")?;
        }
        writeln!(f, "   <-- classified as")?;

        for (name, row) in self.class_names.iter().zip(&self.matrix) {
            write!(f, "{name:>width$}")?;
            for val in row {
                write!(f, " {val:>width$.2}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{i}")).collect()
    }

    fn from_pairs(pairs: &[(usize, usize)], n: usize) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::new(names(n));
        for &(a, p) in pairs {
            cm.record(a, p, 1.0);
        }
        cm
    }

    #[test]
    fn perfect_predictions() {
        let cm = from_pairs(&[(0, 0), (0, 0), (1, 1), (1, 1), (2, 2), (2, 2)], 3);
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        for m in cm.class_metrics() {
            assert!((m.precision - 1.0).abs() < f64::EPSILON);
            assert!((m.recall - 1.0).abs() < f64::EPSILON);
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_confusion_matrix() {
        // Actual: [0,0,0, 1,1,1, 2,2,2]
        // Pred:   [0,0,1, 1,1,2, 2,2,0]
        let cm = from_pairs(
            &[
                (0, 0),
                (0, 0),
                (0, 1),
                (1, 1),
                (1, 1),
                (1, 2),
                (2, 2),
                (2, 2),
                (2, 0),
            ],
            3,
        );
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].support - 3.0).abs() < 1e-12);
        assert_eq!(metrics[0].class, "c0");
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-10);
    }

    #[test]
    fn weights_are_summed() {
        let mut cm = ConfusionMatrix::new(names(2));
        cm.record(0, 0, 2.5);
        cm.record(1, 0, 0.5);
        assert!((cm.total() - 3.0).abs() < 1e-12);
        assert!((cm.accuracy() - 2.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn merge_adds_cells() {
        let mut a = from_pairs(&[(0, 0), (1, 0)], 2);
        let b = from_pairs(&[(1, 1)], 2);
        a.merge(&b);
        assert_eq!(a.as_rows(), &[vec![1.0, 0.0], vec![1.0, 1.0]]);
    }

    #[test]
    fn empty_matrix_has_zero_accuracy() {
        assert_eq!(ConfusionMatrix::new(names(2)).accuracy(), 0.0);
    }

    #[test]
    fn display_uses_class_names() {
        let cm = from_pairs(&[(0, 0), (1, 1)], 2);
        let output = format!("{cm}");
        assert!(output.contains("classified as"));
        assert!(output.contains("c0") && output.contains("c1"));
    }

    #[test]
    fn zero_support_class_metrics() {
        let cm = from_pairs(&[(0, 0), (0, 0), (1, 1), (1, 1)], 3);
        let metrics = cm.class_metrics();
        assert_eq!(metrics[2].support, 0.0);
        assert_eq!(metrics[2].recall, 0.0);
    }
}
