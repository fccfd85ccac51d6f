//! Turning scored rules into synthetic training rows.

use mitree_learn::{Header, Instance, Value};
use tracing::debug;

use crate::{
    contingency::RuleMetrics,
    error::{ContractViolation, DegenerateRule},
    rule::{Condition, DecisionRule},
    strategy::{NumericStrategy, WeightStrategy},
};

/// A rule together with its quality measures.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRule {
    pub rule: DecisionRule,
    pub metrics: RuleMetrics,
}

/// One synthetic row of the meta dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRow {
    /// One value per predictor attribute, in header order.
    pub values: Vec<Value>,
    /// Class index in the header's class labels.
    pub class: usize,
    pub weight: f64,
}

impl MetaRow {
    #[must_use]
    pub fn into_instance(self) -> Instance {
        Instance::new(self.values, self.class, self.weight)
    }
}

/// Why a rule produced no meta rows.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    NonPositiveNovelty { novelty: f64 },
    NonPositiveSatisfaction { satisfaction: f64 },
    /// The metric the weighting strategy needs is undefined for the rule.
    UndefinedMetric {
        strategy: WeightStrategy,
        cause: DegenerateRule,
    },
    NonPositiveWeight { weight: f64 },
}

/// A rule the builder skipped.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Exclusion {
    /// Position of the rule in the builder's input.
    pub rule: usize,
    /// Class the rule predicts.
    pub class: String,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// Rows emitted for one batch of rules, plus the rules that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaBatch {
    pub rows: Vec<MetaRow>,
    pub exclusions: Vec<Exclusion>,
}

impl MetaBatch {
    /// Sum of row weights.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.rows.iter().map(|r| r.weight).sum()
    }
}

/// Builds meta rows for datasets with schema `header`.
///
/// Each rule goes through, in order:
///
/// 1. the weighting strategy's filter (novelty or satisfaction `<= 0`),
/// 2. a support check (`weight <= 0` is skipped),
/// 3. a single row when the rule tests no numeric attribute,
/// 4. otherwise a single row at the interval midpoints under
///    [`NumericStrategy::Average`],
/// 5. or two half-weight rows, one at every interval minimum and one at every
///    maximum, under [`NumericStrategy::Interval`].
///
/// Attributes the rule does not test are missing in every row.
#[derive(Debug, Clone, Copy)]
pub struct MetaDatasetBuilder<'a> {
    header: &'a Header,
    numeric: NumericStrategy,
    weight: WeightStrategy,
    novelty_scale: f64,
}

impl<'a> MetaDatasetBuilder<'a> {
    #[must_use]
    pub fn new(header: &'a Header, numeric: NumericStrategy, weight: WeightStrategy) -> Self {
        Self {
            header,
            numeric,
            weight,
            novelty_scale: 1.0,
        }
    }

    /// Extra factor on novelty-weighted rows.
    #[must_use]
    pub fn with_novelty_scale(mut self, novelty_scale: f64) -> Self {
        self.novelty_scale = novelty_scale;
        self
    }

    /// Rows for `rules`, in input order.
    ///
    /// Degenerate metrics never fail the batch; they exclude the rule when
    /// the weighting strategy needs them.
    ///
    /// # Errors
    ///
    /// A [`ContractViolation`] when a rule names an attribute, nominal label
    /// or class the header does not declare.
    pub fn build(&self, rules: &[ScoredRule]) -> Result<MetaBatch, ContractViolation> {
        let mut batch = MetaBatch::default();
        for (index, scored) in rules.iter().enumerate() {
            match self.row_weight(scored) {
                Ok(weight) => self.emit(&scored.rule, weight, &mut batch.rows)?,
                Err(reason) => {
                    debug!(rule = index, ?reason, "rule excluded");
                    batch.exclusions.push(Exclusion {
                        rule: index,
                        class: scored.rule.class().to_string(),
                        reason,
                    });
                }
            }
        }
        Ok(batch)
    }

    /// Steps 1 and 2, then the weighted metric.
    fn row_weight(&self, scored: &ScoredRule) -> Result<f64, ExclusionReason> {
        let metrics = &scored.metrics;
        match self.weight {
            WeightStrategy::Novelty if metrics.novelty <= 0.0 => {
                return Err(ExclusionReason::NonPositiveNovelty {
                    novelty: metrics.novelty,
                });
            }
            WeightStrategy::Satisfaction => match metrics.satisfaction {
                Ok(satisfaction) if satisfaction <= 0.0 => {
                    return Err(ExclusionReason::NonPositiveSatisfaction { satisfaction });
                }
                Err(cause) => {
                    return Err(ExclusionReason::UndefinedMetric {
                        strategy: self.weight,
                        cause,
                    });
                }
                Ok(_) => {}
            },
            _ => {}
        }

        let weight = scored.rule.weight();
        if weight <= 0.0 {
            return Err(ExclusionReason::NonPositiveWeight { weight });
        }

        metrics
            .weighted(self.weight, weight, self.novelty_scale)
            .map_err(|cause| ExclusionReason::UndefinedMetric {
                strategy: self.weight,
                cause,
            })
    }

    /// Steps 3 to 5.
    fn emit(&self, rule: &DecisionRule, weight: f64, rows: &mut Vec<MetaRow>) -> Result<(), ContractViolation> {
        let class = self
            .header
            .class_index(rule.class())
            .ok_or_else(|| ContractViolation::UnknownClass {
                label: rule.class().to_string(),
            })?;

        if !rule.has_numeric_condition() {
            rows.push(MetaRow {
                values: self.values(rule, |lo, _| lo)?,
                class,
                weight,
            });
            return Ok(());
        }

        match self.numeric {
            NumericStrategy::Average => rows.push(MetaRow {
                values: self.values(rule, |lo, hi| (lo + hi) / 2.0)?,
                class,
                weight,
            }),
            NumericStrategy::Interval => {
                let half = weight / 2.0;
                rows.push(MetaRow {
                    values: self.values(rule, |lo, _| lo)?,
                    class,
                    weight: half,
                });
                rows.push(MetaRow {
                    values: self.values(rule, |_, hi| hi)?,
                    class,
                    weight: half,
                });
            }
        }
        Ok(())
    }

    /// Row values for `rule`; `pick` chooses a value inside a numeric interval.
    fn values(&self, rule: &DecisionRule, pick: impl Fn(f64, f64) -> f64) -> Result<Vec<Value>, ContractViolation> {
        let mut values = vec![Value::Missing; self.header.n_attributes()];
        for condition in rule.conditions() {
            let name = condition.attribute();
            let index = self
                .header
                .attribute_index(name)
                .ok_or_else(|| ContractViolation::UnknownAttribute {
                    attribute: name.to_string(),
                })?;
            values[index] = match condition {
                // Excluding one label pins no value.
                Condition::NominalNotEquals { .. } => continue,
                Condition::NominalEquals { attribute, value } => {
                    let label = self.header.attribute(index).value_index(value).ok_or_else(|| {
                        ContractViolation::UnknownNominalValue {
                            attribute: attribute.clone(),
                            value: value.clone(),
                        }
                    })?;
                    Value::Nominal(label)
                }
                Condition::NumericRange {
                    effective_min,
                    effective_max,
                    ..
                } => Value::Numeric(pick(*effective_min, *effective_max)),
            };
        }
        Ok(values)
    }
}
