//! Decision rules: root-to-leaf paths of a tree.

use std::fmt;

use crate::catalog::AttributeSummary;

/// Comparison of a numeric split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Comparison {
    /// `value < boundary` (left branch).
    Less,
    /// `value >= boundary` (right branch).
    GreaterOrEqual,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Less => write!(f, "<"),
            Comparison::GreaterOrEqual => write!(f, ">="),
        }
    }
}

/// One conjunct of a rule.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// `attribute = value`.
    NominalEquals { attribute: String, value: String },
    /// `attribute != value`, the right branch of a binary split.
    NominalNotEquals { attribute: String, value: String },
    /// Running interval of a numeric attribute along the path.
    ///
    /// `operator` and `boundary` are those of the latest test on the
    /// attribute; the interval is the intersection of every test on it,
    /// clamped into the attribute's catalog range.
    NumericRange {
        attribute: String,
        operator: Comparison,
        boundary: f64,
        effective_min: f64,
        effective_max: f64,
    },
}

impl Condition {
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Condition::NominalEquals { attribute, .. }
            | Condition::NominalNotEquals { attribute, .. }
            | Condition::NumericRange { attribute, .. } => attribute,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Condition::NumericRange { .. })
    }

    /// `(effective_min, effective_max)` of a numeric condition.
    #[must_use]
    pub fn interval(&self) -> Option<(f64, f64)> {
        match self {
            Condition::NumericRange {
                effective_min,
                effective_max,
                ..
            } => Some((*effective_min, *effective_max)),
            Condition::NominalEquals { .. } | Condition::NominalNotEquals { .. } => None,
        }
    }

    /// First appearance of a numeric test on a path.
    ///
    /// The open side of the interval comes from the catalog summary.
    pub(crate) fn first_numeric(
        summary: &AttributeSummary,
        operator: Comparison,
        boundary: f64,
    ) -> Self {
        let clamped = boundary.clamp(summary.min, summary.max);
        let (effective_min, effective_max) = match operator {
            Comparison::Less => (summary.min, clamped),
            Comparison::GreaterOrEqual => (clamped, summary.max),
        };
        Condition::NumericRange {
            attribute: summary.name.clone(),
            operator,
            boundary,
            effective_min,
            effective_max,
        }
    }

    /// Apply a repeated numeric test on the same attribute.
    ///
    /// A `<` lowers the maximum, a `>=` raises the minimum; the new bound
    /// never crosses the other side of the running interval.
    pub(crate) fn tightened(&self, next_operator: Comparison, next_boundary: f64) -> Self {
        let Condition::NumericRange {
            attribute,
            effective_min,
            effective_max,
            ..
        } = self
        else {
            return self.clone();
        };
        let (mut lo, mut hi) = (*effective_min, *effective_max);
        match next_operator {
            Comparison::Less if next_boundary < hi => hi = next_boundary.max(lo),
            Comparison::GreaterOrEqual if next_boundary > lo => lo = next_boundary.min(hi),
            _ => {}
        }
        Condition::NumericRange {
            attribute: attribute.clone(),
            operator: next_operator,
            boundary: next_boundary,
            effective_min: lo,
            effective_max: hi,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::NominalEquals { attribute, value } => write!(f, "{attribute} = {value}"),
            Condition::NominalNotEquals { attribute, value } => write!(f, "{attribute} != {value}"),
            Condition::NumericRange {
                attribute,
                operator,
                boundary,
                ..
            } => write!(f, "{attribute} {operator} {boundary}"),
        }
    }
}

/// Return `path` extended by `condition`, merging repeated numeric tests.
///
/// A numeric attribute keeps a single condition at the position of its
/// first appearance.
pub(crate) fn extend_path(path: &[Condition], condition: Condition) -> Vec<Condition> {
    let mut extended = path.to_vec();
    if let Condition::NumericRange {
        operator, boundary, ..
    } = &condition
        && let Some(existing) = extended
            .iter_mut()
            .find(|c| c.is_numeric() && c.attribute() == condition.attribute())
    {
        *existing = existing.tightened(*operator, *boundary);
        return extended;
    }
    extended.push(condition);
    extended
}

/// A root-to-leaf path with the leaf's prediction and support.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DecisionRule {
    class: String,
    conditions: Vec<Condition>,
    weight: f64,
    error: f64,
}

impl DecisionRule {
    /// Create a rule. `error` is the misclassified part of `weight`.
    #[must_use]
    pub fn new(class: impl Into<String>, conditions: Vec<Condition>, weight: f64, error: f64) -> Self {
        Self {
            class: class.into(),
            conditions,
            weight,
            error,
        }
    }

    /// Predicted class label.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Conditions in root-to-leaf order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Training weight that reached the leaf.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn error(&self) -> f64 {
        self.error
    }

    /// `weight - error`.
    #[must_use]
    pub fn correct(&self) -> f64 {
        self.weight - self.error
    }

    #[must_use]
    pub fn has_numeric_condition(&self) -> bool {
        self.conditions.iter().any(Condition::is_numeric)
    }

    /// The condition on `attribute`, if the path tests it.
    ///
    /// An equality test wins over exclusions of single labels.
    #[must_use]
    pub fn condition_for(&self, attribute: &str) -> Option<&Condition> {
        let mut tested = self.conditions.iter().filter(|c| c.attribute() == attribute);
        let first = tested.next()?;
        if !matches!(first, Condition::NominalNotEquals { .. }) {
            return Some(first);
        }
        tested
            .find(|c| matches!(c, Condition::NominalEquals { .. }))
            .or(Some(first))
    }
}

impl fmt::Display for DecisionRule {
    /// `A = x -> B >= 1.5 -> c1`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for condition in &self.conditions {
            write!(f, "{condition} -> ")?;
        }
        write!(f, "{}", self.class)
    }
}
