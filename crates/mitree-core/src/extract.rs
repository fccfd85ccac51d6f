//! Flattening a tree into its root-to-leaf rules.

use mitree_learn::{AttributeKind, Header};

use crate::{
    catalog::AttributeCatalog,
    error::ContractViolation,
    rule::{Comparison, Condition, DecisionRule, extend_path},
    traits::{InspectTree, LeafDistribution, SplitKind, TreeNode},
};

/// Walks trees trained on a dataset with schema `header`.
///
/// Rules come out depth-first with branches in ascending order. Leaves that
/// saw no training weight are dropped.
#[derive(Debug, Clone, Copy)]
pub struct RuleExtractor<'a> {
    header: &'a Header,
    catalog: &'a AttributeCatalog,
}

impl<'a> RuleExtractor<'a> {
    #[must_use]
    pub fn new(header: &'a Header, catalog: &'a AttributeCatalog) -> Self {
        Self { header, catalog }
    }

    /// Every rule of `tree` with positive weight.
    ///
    /// # Errors
    ///
    /// A [`ContractViolation`] when a node does not fit the schema: an
    /// unknown attribute, a split kind differing from the attribute's kind,
    /// a wrong branch count, a numeric split without threshold, a binary
    /// split without a known label, or a leaf distribution of the wrong
    /// length.
    pub fn extract<T: InspectTree>(&self, tree: &T) -> Result<Vec<DecisionRule>, ContractViolation> {
        let mut rules = Vec::new();
        self.visit(&tree.root(), &[], &mut rules)?;
        Ok(rules)
    }

    fn visit<N: TreeNode>(
        &self,
        node: &N,
        path: &[Condition],
        rules: &mut Vec<DecisionRule>,
    ) -> Result<(), ContractViolation> {
        if node.is_leaf() {
            let rule = self.leaf_rule(node, path.to_vec())?;
            if rule.weight() > 0.0 {
                rules.push(rule);
            }
            return Ok(());
        }

        let name = node
            .split_attribute()
            .ok_or(ContractViolation::MissingSplitAttribute)?;
        let index = self
            .header
            .attribute_index(name)
            .ok_or_else(|| ContractViolation::UnknownAttribute {
                attribute: name.to_string(),
            })?;
        let attribute = self.header.attribute(index);
        let declared = match attribute.kind() {
            AttributeKind::Nominal { .. } => SplitKind::Nominal,
            AttributeKind::Numeric => SplitKind::Numeric,
        };
        let reported = node.split_kind().unwrap_or(declared);
        let fits = reported == declared
            || (declared == SplitKind::Nominal && reported == SplitKind::Binary);
        if !fits {
            return Err(ContractViolation::SplitKindMismatch {
                attribute: name.to_string(),
                declared,
                reported,
            });
        }

        let children = node.children();
        match reported {
            SplitKind::Nominal => {
                if children.len() != attribute.n_values() {
                    return Err(ContractViolation::NominalArityMismatch {
                        attribute: name.to_string(),
                        expected: attribute.n_values(),
                        got: children.len(),
                    });
                }
                for (child, value) in children.iter().zip(attribute.values()) {
                    let condition = Condition::NominalEquals {
                        attribute: name.to_string(),
                        value: value.clone(),
                    };
                    self.visit(child, &extend_path(path, condition), rules)?;
                }
            }
            SplitKind::Binary => {
                if children.len() != 2 {
                    return Err(ContractViolation::BinaryArityMismatch {
                        attribute: name.to_string(),
                        got: children.len(),
                    });
                }
                let value =
                    node.split_value()
                        .ok_or_else(|| ContractViolation::MissingSplitValue {
                            attribute: name.to_string(),
                        })?;
                if attribute.value_index(value).is_none() {
                    return Err(ContractViolation::UnknownNominalValue {
                        attribute: name.to_string(),
                        value: value.to_string(),
                    });
                }
                let (attribute, value) = (name.to_string(), value.to_string());
                let branches = [
                    Condition::NominalEquals {
                        attribute: attribute.clone(),
                        value: value.clone(),
                    },
                    Condition::NominalNotEquals { attribute, value },
                ];
                for (child, condition) in children.iter().zip(branches) {
                    self.visit(child, &extend_path(path, condition), rules)?;
                }
            }
            SplitKind::Numeric => {
                if children.len() != 2 {
                    return Err(ContractViolation::NumericArityMismatch {
                        attribute: name.to_string(),
                        got: children.len(),
                    });
                }
                let threshold =
                    node.split_threshold()
                        .ok_or_else(|| ContractViolation::MissingThreshold {
                            attribute: name.to_string(),
                        })?;
                let summary = self.catalog.require(name)?;
                for (child, operator) in children
                    .iter()
                    .zip([Comparison::Less, Comparison::GreaterOrEqual])
                {
                    let condition = Condition::first_numeric(summary, operator, threshold);
                    self.visit(child, &extend_path(path, condition), rules)?;
                }
            }
        }
        Ok(())
    }

    fn leaf_rule<N: TreeNode>(
        &self,
        node: &N,
        conditions: Vec<Condition>,
    ) -> Result<DecisionRule, ContractViolation> {
        match node.class_distribution() {
            None => Ok(DecisionRule::new(
                self.header.class_label(0),
                conditions,
                0.0,
                0.0,
            )),
            Some(LeafDistribution::Classification(distribution)) => {
                let n_classes = self.header.n_classes();
                if distribution.len() != n_classes {
                    return Err(ContractViolation::ClassCountMismatch {
                        expected: n_classes,
                        got: distribution.len(),
                    });
                }
                // First maximum wins ties.
                let (class, max) = distribution.iter().enumerate().fold(
                    (0usize, f64::NEG_INFINITY),
                    |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) },
                );
                let weight: f64 = distribution.iter().sum();
                Ok(DecisionRule::new(
                    self.header.class_label(class),
                    conditions,
                    weight,
                    weight - max,
                ))
            }
            Some(LeafDistribution::Regression {
                mean,
                weight,
                error_sum,
            }) => {
                let error = if weight > 0.0 { error_sum / weight } else { 0.0 };
                Ok(DecisionRule::new(
                    format!("{mean:.2}"),
                    conditions,
                    weight,
                    error,
                ))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use mitree_learn::{Attribute, Dataset, Instance, Value};

    use super::*;

    /// Hand-written tree for exercising the extractor without a learner.
    #[derive(Debug, Clone)]
    pub(crate) enum Scripted {
        Leaf(Option<LeafDistribution>),
        Split {
            attribute: String,
            kind: SplitKind,
            threshold: Option<f64>,
            value: Option<String>,
            children: Vec<Scripted>,
        },
    }

    impl Scripted {
        pub(crate) fn leaf(distribution: &[f64]) -> Self {
            Scripted::Leaf(Some(LeafDistribution::Classification(distribution.to_vec())))
        }

        pub(crate) fn nominal(attribute: &str, children: Vec<Scripted>) -> Self {
            Scripted::Split {
                attribute: attribute.into(),
                kind: SplitKind::Nominal,
                threshold: None,
                value: None,
                children,
            }
        }

        pub(crate) fn numeric(attribute: &str, threshold: f64, left: Scripted, right: Scripted) -> Self {
            Scripted::Split {
                attribute: attribute.into(),
                kind: SplitKind::Numeric,
                threshold: Some(threshold),
                value: None,
                children: vec![left, right],
            }
        }

        pub(crate) fn binary(attribute: &str, value: &str, matching: Scripted, rest: Scripted) -> Self {
            Scripted::Split {
                attribute: attribute.into(),
                kind: SplitKind::Binary,
                threshold: None,
                value: Some(value.into()),
                children: vec![matching, rest],
            }
        }
    }

    impl TreeNode for &Scripted {
        fn is_leaf(&self) -> bool {
            matches!(self, Scripted::Leaf(_))
        }

        fn split_attribute(&self) -> Option<&str> {
            match self {
                Scripted::Split { attribute, .. } => Some(attribute.as_str()),
                Scripted::Leaf(_) => None,
            }
        }

        fn split_kind(&self) -> Option<SplitKind> {
            match self {
                Scripted::Split { kind, .. } => Some(*kind),
                Scripted::Leaf(_) => None,
            }
        }

        fn split_threshold(&self) -> Option<f64> {
            match self {
                Scripted::Split { threshold, .. } => *threshold,
                Scripted::Leaf(_) => None,
            }
        }

        fn split_value(&self) -> Option<&str> {
            match self {
                Scripted::Split { value, .. } => value.as_deref(),
                Scripted::Leaf(_) => None,
            }
        }

        fn children(&self) -> Vec<Self> {
            match *self {
                Scripted::Split { children, .. } => children.iter().collect(),
                Scripted::Leaf(_) => Vec::new(),
            }
        }

        fn class_distribution(&self) -> Option<LeafDistribution> {
            match self {
                Scripted::Leaf(d) => d.clone(),
                Scripted::Split { .. } => None,
            }
        }
    }

    impl InspectTree for Scripted {
        type Node<'a> = &'a Scripted;

        fn root(&self) -> &Scripted {
            self
        }
    }

    /// `A` in {x, y}, `B` in {p, q}, numeric `N` over [0, 10]; classes c1, c2.
    pub(crate) fn mixed_data() -> Dataset {
        let header = Header::new(
            "mixed",
            vec![
                Attribute::nominal("A", vec!["x".into(), "y".into()]),
                Attribute::nominal("B", vec!["p".into(), "q".into()]),
                Attribute::numeric("N"),
            ],
            Attribute::nominal("class", vec!["c1".into(), "c2".into()]),
        )
        .unwrap();
        let mut ds = Dataset::new(header);
        for (a, b, n, class) in [(0, 0, 0.0, 0), (0, 1, 10.0, 0), (1, 0, 4.0, 1), (1, 1, 6.0, 0)] {
            ds.push(Instance::new(
                vec![Value::Nominal(a), Value::Nominal(b), Value::Numeric(n)],
                class,
                2.0,
            ))
            .unwrap();
        }
        ds
    }

    fn extract(tree: &Scripted) -> Result<Vec<DecisionRule>, ContractViolation> {
        let data = mixed_data();
        let catalog = AttributeCatalog::build(&data);
        RuleExtractor::new(data.header(), &catalog).extract(tree)
    }

    #[test]
    fn nominal_paths_in_branch_order() {
        let tree = Scripted::nominal(
            "A",
            vec![
                Scripted::leaf(&[4.0, 0.0]),
                Scripted::nominal("B", vec![Scripted::leaf(&[1.0, 2.0]), Scripted::leaf(&[1.0, 0.0])]),
            ],
        );
        let rules = extract(&tree).unwrap();
        let text: Vec<String> = rules.iter().map(ToString::to_string).collect();
        assert_eq!(text, ["A = x -> c1", "A = y -> B = p -> c2", "A = y -> B = q -> c1"]);
        assert_eq!(
            rules.iter().map(|r| (r.weight(), r.error())).collect::<Vec<_>>(),
            [(4.0, 0.0), (3.0, 1.0), (1.0, 0.0)]
        );
    }

    #[test]
    fn zero_weight_and_missing_leaves_dropped() {
        let tree = Scripted::nominal(
            "A",
            vec![Scripted::leaf(&[0.0, 0.0]), Scripted::Leaf(None)],
        );
        assert!(extract(&tree).unwrap().is_empty());
    }

    #[test]
    fn ties_pick_first_class() {
        let rules = extract(&Scripted::nominal(
            "A",
            vec![Scripted::leaf(&[2.0, 2.0]), Scripted::leaf(&[0.0, 1.0])],
        ))
        .unwrap();
        assert_eq!(rules[0].class(), "c1");
        assert_eq!(rules[0].error(), 2.0);
    }

    #[test]
    fn numeric_bounds_come_from_catalog_then_tighten() {
        let tree = Scripted::numeric(
            "N",
            7.0,
            Scripted::numeric("N", 3.0, Scripted::leaf(&[1.0, 0.0]), Scripted::leaf(&[0.0, 1.0])),
            Scripted::leaf(&[2.0, 0.0]),
        );
        let rules = extract(&tree).unwrap();
        let intervals: Vec<_> = rules
            .iter()
            .map(|r| r.conditions()[0].interval().unwrap())
            .collect();
        assert_eq!(intervals, [(0.0, 3.0), (3.0, 7.0), (7.0, 10.0)]);
        assert!(rules.iter().all(|r| r.conditions().len() == 1));
    }

    #[test]
    fn regression_leaf_uses_mean_label_and_average_error() {
        let tree = Scripted::nominal(
            "A",
            vec![
                Scripted::Leaf(Some(LeafDistribution::Regression {
                    mean: 3.456,
                    weight: 4.0,
                    error_sum: 2.0,
                })),
                Scripted::Leaf(Some(LeafDistribution::Regression {
                    mean: 1.0,
                    weight: 0.0,
                    error_sum: 0.0,
                })),
            ],
        );
        let rules = extract(&tree).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].class(), "3.46");
        assert_eq!(rules[0].error(), 0.5);
    }

    #[test]
    fn binary_split_tests_label_then_excludes_it() {
        let tree = Scripted::binary(
            "A",
            "y",
            Scripted::leaf(&[0.0, 3.0]),
            Scripted::nominal("B", vec![Scripted::leaf(&[2.0, 0.0]), Scripted::leaf(&[1.0, 1.0])]),
        );
        let rules = extract(&tree).unwrap();
        let text: Vec<String> = rules.iter().map(ToString::to_string).collect();
        assert_eq!(text, ["A = y -> c2", "A != y -> B = p -> c1", "A != y -> B = q -> c1"]);
    }

    // --- Contract violations ---

    #[test]
    fn unknown_attribute() {
        let tree = Scripted::nominal("Z", vec![Scripted::leaf(&[1.0, 0.0])]);
        assert!(matches!(
            extract(&tree).unwrap_err(),
            ContractViolation::UnknownAttribute { .. }
        ));
    }

    #[test]
    fn kind_mismatch() {
        let tree = Scripted::numeric("A", 0.5, Scripted::leaf(&[1.0, 0.0]), Scripted::leaf(&[1.0, 0.0]));
        assert!(matches!(
            extract(&tree).unwrap_err(),
            ContractViolation::SplitKindMismatch {
                declared: SplitKind::Nominal,
                reported: SplitKind::Numeric,
                ..
            }
        ));
    }

    #[test]
    fn nominal_arity_mismatch() {
        let tree = Scripted::nominal("A", vec![Scripted::leaf(&[1.0, 0.0])]);
        assert!(matches!(
            extract(&tree).unwrap_err(),
            ContractViolation::NominalArityMismatch { expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn binary_split_needs_known_label_and_two_branches() {
        let unknown = Scripted::binary("A", "z", Scripted::leaf(&[1.0, 0.0]), Scripted::leaf(&[1.0, 0.0]));
        assert!(matches!(
            extract(&unknown).unwrap_err(),
            ContractViolation::UnknownNominalValue { ref value, .. } if value == "z"
        ));

        let three = Scripted::Split {
            attribute: "A".into(),
            kind: SplitKind::Binary,
            threshold: None,
            value: Some("x".into()),
            children: vec![Scripted::leaf(&[1.0, 0.0]); 3],
        };
        assert!(matches!(
            extract(&three).unwrap_err(),
            ContractViolation::BinaryArityMismatch { got: 3, .. }
        ));

        let numeric = Scripted::binary("N", "x", Scripted::leaf(&[1.0, 0.0]), Scripted::leaf(&[1.0, 0.0]));
        assert!(matches!(
            extract(&numeric).unwrap_err(),
            ContractViolation::SplitKindMismatch {
                declared: SplitKind::Numeric,
                reported: SplitKind::Binary,
                ..
            }
        ));
    }

    #[test]
    fn distribution_length_mismatch() {
        let tree = Scripted::nominal(
            "A",
            vec![Scripted::leaf(&[1.0, 0.0, 3.0]), Scripted::leaf(&[1.0, 0.0])],
        );
        assert!(matches!(
            extract(&tree).unwrap_err(),
            ContractViolation::ClassCountMismatch { expected: 2, got: 3 }
        ));
    }
}
