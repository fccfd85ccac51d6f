//! Rule quality from the rule's 2x2 contingency table.

use mitree_learn::Dataset;

use crate::{
    error::{ContractViolation, DegenerateRule},
    rule::DecisionRule,
    strategy::WeightStrategy,
};

/// Dataset-wide class weights the contingency tables are measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTotals {
    labels: Vec<String>,
    weights: Vec<f64>,
    total: f64,
}

impl ClassTotals {
    /// Class weights of `data`, indexed like its class labels.
    #[must_use]
    pub fn from_dataset(data: &Dataset) -> Self {
        let weights = data.class_weights();
        Self {
            labels: data.header().class_values().to_vec(),
            total: weights.iter().sum(),
            weights,
        }
    }

    /// Weight of the class called `label`.
    #[must_use]
    pub fn weight_of(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.weights[i])
    }

    /// Total weight over all classes.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Number of class labels.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }
}

/// Weights of a rule's predicted class inside and outside the rule.
///
/// |                | predicted class | other classes |
/// |----------------|-----------------|---------------|
/// | covered by rule| `a`             | `b`           |
/// | not covered    | `c`             | `d`           |
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ContingencyMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl ContingencyMatrix {
    /// Weight covered by the rule, `a + b`.
    #[must_use]
    pub fn l(&self) -> f64 {
        self.a + self.b
    }

    /// Weight of the predicted class, `a + c`.
    #[must_use]
    pub fn r(&self) -> f64 {
        self.a + self.c
    }

    /// Weight not covered by the rule, `c + d`.
    #[must_use]
    pub fn not_l(&self) -> f64 {
        self.c + self.d
    }

    /// Weight of the other classes, `b + d`.
    #[must_use]
    pub fn not_r(&self) -> f64 {
        self.b + self.d
    }
}

/// Quality measures of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMetrics {
    pub matrix: ContingencyMatrix,
    /// `a / l`.
    pub precision: Result<f64, DegenerateRule>,
    /// `(a + 1) / (l + n_classes)`.
    pub laplace: f64,
    /// `a / T - l * r / T^2`.
    pub novelty: f64,
    /// `1 - T * b / (l * (b + d))`.
    pub satisfaction: Result<f64, DegenerateRule>,
}

impl RuleMetrics {
    /// Score `rule` against the dataset-wide `totals`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation::UnknownClass`] when the rule predicts a
    /// label `totals` does not know.
    pub fn compute(rule: &DecisionRule, totals: &ClassTotals) -> Result<Self, ContractViolation> {
        let class_weight =
            totals
                .weight_of(rule.class())
                .ok_or_else(|| ContractViolation::UnknownClass {
                    label: rule.class().to_string(),
                })?;
        let total = totals.total();
        let a = rule.correct();
        let b = rule.error();
        let matrix = ContingencyMatrix {
            a,
            b,
            c: class_weight - a,
            d: (total - class_weight) - b,
        };
        let l = matrix.l();
        let r = matrix.r();

        let precision = if l > 0.0 {
            Ok(a / l)
        } else {
            Err(DegenerateRule::ZeroSupport)
        };
        let laplace = (a + 1.0) / (l + totals.n_classes() as f64);
        let novelty = if total > 0.0 {
            a / total - (l * r) / (total * total)
        } else {
            0.0
        };
        let satisfaction = if l <= 0.0 {
            Err(DegenerateRule::ZeroSupport)
        } else if matrix.not_r() <= 0.0 {
            Err(DegenerateRule::NoNegatives)
        } else {
            Ok(1.0 - (total * b) / (l * matrix.not_r()))
        };

        Ok(Self {
            matrix,
            precision,
            laplace,
            novelty,
            satisfaction,
        })
    }

    /// The metric `strategy` selects, unscaled.
    ///
    /// # Errors
    ///
    /// The [`DegenerateRule`] cause when that metric is undefined.
    pub fn metric(&self, strategy: WeightStrategy) -> Result<f64, DegenerateRule> {
        match strategy {
            WeightStrategy::Precision => self.precision,
            WeightStrategy::Laplace => Ok(self.laplace),
            WeightStrategy::Novelty => Ok(self.novelty),
            WeightStrategy::Satisfaction => self.satisfaction,
        }
    }

    /// `rule_weight * metric`; novelty is additionally multiplied by `novelty_scale`.
    ///
    /// # Errors
    ///
    /// The [`DegenerateRule`] cause when the selected metric is undefined.
    pub fn weighted(
        &self,
        strategy: WeightStrategy,
        rule_weight: f64,
        novelty_scale: f64,
    ) -> Result<f64, DegenerateRule> {
        let metric = self.metric(strategy)?;
        Ok(match strategy {
            WeightStrategy::Novelty => rule_weight * metric * novelty_scale,
            _ => rule_weight * metric,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Condition;

    fn totals() -> ClassTotals {
        ClassTotals {
            labels: vec!["c1".into(), "c2".into()],
            weights: vec![5.0, 3.0],
            total: 8.0,
        }
    }

    fn rule(class: &str, weight: f64, error: f64) -> DecisionRule {
        DecisionRule::new(
            class,
            vec![Condition::NominalEquals {
                attribute: "A".into(),
                value: "x".into(),
            }],
            weight,
            error,
        )
    }

    #[test]
    fn matrix_cells() {
        let m = RuleMetrics::compute(&rule("c2", 3.0, 1.0), &totals()).unwrap().matrix;
        assert_eq!((m.a, m.b, m.c, m.d), (2.0, 1.0, 1.0, 4.0));
        assert_eq!((m.l(), m.r(), m.not_l(), m.not_r()), (3.0, 3.0, 5.0, 5.0));
    }

    #[test]
    fn margins_sum_to_total() {
        for (class, w, e) in [("c1", 4.0, 0.0), ("c2", 3.0, 1.0), ("c1", 1.0, 0.5), ("c2", 0.0, 0.0)] {
            let m = RuleMetrics::compute(&rule(class, w, e), &totals()).unwrap().matrix;
            assert!((m.l() + m.not_l() - 8.0).abs() < 1e-12);
            assert!((m.r() + m.not_r() - 8.0).abs() < 1e-12);
        }
    }

    #[test]
    fn metric_values() {
        let m = RuleMetrics::compute(&rule("c1", 4.0, 0.0), &totals()).unwrap();
        assert_eq!(m.precision, Ok(1.0));
        assert!((m.laplace - 5.0 / 6.0).abs() < 1e-12);
        // 4/8 - 4*5/64
        assert!((m.novelty - (0.5 - 20.0 / 64.0)).abs() < 1e-12);
        assert_eq!(m.satisfaction, Ok(1.0));

        let m = RuleMetrics::compute(&rule("c2", 3.0, 1.0), &totals()).unwrap();
        assert!((m.precision.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        // 1 - 8*1 / (3*5)
        assert!((m.satisfaction.unwrap() - (1.0 - 8.0 / 15.0)).abs() < 1e-12);
    }

    #[test]
    fn zero_support_is_degenerate() {
        let m = RuleMetrics::compute(&rule("c1", 0.0, 0.0), &totals()).unwrap();
        assert_eq!(m.precision, Err(DegenerateRule::ZeroSupport));
        assert_eq!(m.satisfaction, Err(DegenerateRule::ZeroSupport));
        assert!((m.laplace - 0.5).abs() < 1e-12);
        assert_eq!(m.novelty, 0.0);
    }

    #[test]
    fn no_negatives_is_degenerate() {
        let single = ClassTotals {
            labels: vec!["only".into()],
            weights: vec![6.0],
            total: 6.0,
        };
        let m = RuleMetrics::compute(&rule("only", 6.0, 0.0), &single).unwrap();
        assert_eq!(m.satisfaction, Err(DegenerateRule::NoNegatives));
        assert_eq!(m.precision, Ok(1.0));
    }

    #[test]
    fn unknown_class_is_contract_violation() {
        let err = RuleMetrics::compute(&rule("c9", 1.0, 0.0), &totals()).unwrap_err();
        assert_eq!(err, ContractViolation::UnknownClass { label: "c9".into() });
    }

    #[test]
    fn weighted_scales_by_rule_weight() {
        let m = RuleMetrics::compute(&rule("c1", 4.0, 0.0), &totals()).unwrap();
        assert_eq!(m.weighted(WeightStrategy::Precision, 4.0, 1.0), Ok(4.0));
        let n = m.weighted(WeightStrategy::Novelty, 4.0, 100.0).unwrap();
        assert!((n - 4.0 * m.novelty * 100.0).abs() < 1e-9);
        let degenerate = RuleMetrics::compute(&rule("c1", 0.0, 0.0), &totals()).unwrap();
        assert_eq!(
            degenerate.weighted(WeightStrategy::Satisfaction, 0.0, 1.0),
            Err(DegenerateRule::ZeroSupport)
        );
        assert!(degenerate.weighted(WeightStrategy::Laplace, 0.0, 1.0).is_ok());
    }
}
