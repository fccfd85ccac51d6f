use crate::{
    LearnError,
    dataset::{Dataset, Header, Value},
    node::{Node, NodeIndex, argmax},
    split::Test,
};

/// A fitted decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// always at index 0. The tree carries the [`Header`] it was trained on so it
/// can name attributes and classes when rendered or inspected.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) header: Header,
}

impl DecisionTree {
    /// Return the schema the tree was trained on.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Return all nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` does not belong to this tree.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Class probability distribution for one row of predictor values.
    ///
    /// A missing test value sends the row down every branch, and the
    /// branch results are mixed by the training weight of each branch. A
    /// leaf that saw no training weight answers with its parent's
    /// distribution.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::PredictionValueMismatch`] when `values.len()`
    /// differs from the number of predictor attributes.
    pub fn distribution_for(&self, values: &[Value]) -> Result<Vec<f64>, LearnError> {
        let expected = self.header.n_attributes();
        if values.len() != expected {
            return Err(LearnError::PredictionValueMismatch {
                expected,
                got: values.len(),
            });
        }
        let root = &self.nodes[0];
        Ok(self.probabilities(NodeIndex::ROOT, values, root.distribution()))
    }

    /// Predict the class index for one row of predictor values.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::PredictionValueMismatch`] when `values.len()`
    /// differs from the number of predictor attributes.
    pub fn classify(&self, values: &[Value]) -> Result<usize, LearnError> {
        self.distribution_for(values).map(|p| argmax(&p))
    }

    /// Predict every instance of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::PredictionValueMismatch`] when the dataset has a
    /// different attribute count than the tree.
    pub fn classify_dataset(&self, data: &Dataset) -> Result<Vec<usize>, LearnError> {
        data.instances()
            .iter()
            .map(|instance| self.classify(instance.values()))
            .collect()
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Weighted training error summed over all leaves.
    #[must_use]
    pub fn training_error(&self) -> f64 {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| {
                let d = n.distribution();
                d.iter().sum::<f64>() - d.get(argmax(d)).copied().unwrap_or(0.0)
            })
            .sum()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((NodeIndex::ROOT, 0usize));
        while let Some((index, d)) = queue.pop_front() {
            let node = self.node(index);
            if node.is_leaf() {
                max_depth = max_depth.max(d);
            }
            for child in node.children() {
                queue.push_back((child, d + 1));
            }
        }
        max_depth
    }

    fn probabilities(&self, index: NodeIndex, values: &[Value], parent: &[f64]) -> Vec<f64> {
        let node = self.node(index);
        let own = if node.weight() > 0.0 {
            node.distribution()
        } else {
            parent
        };
        let Some((attribute, test)) = test_of(node) else {
            return normalize(own);
        };
        let children = node.children();
        match test.branch_of(values[attribute]) {
            Some(branch) => match children.get(branch) {
                Some(&child) => self.probabilities(child, values, own),
                None => normalize(own),
            },
            None => {
                let total: f64 = children.iter().map(|&c| self.node(c).weight()).sum();
                if total <= 0.0 {
                    return normalize(own);
                }
                let mut mixed = vec![0.0; own.len()];
                for &child in &children {
                    let share = self.node(child).weight() / total;
                    if share > 0.0 {
                        for (m, p) in mixed.iter_mut().zip(self.probabilities(child, values, own)) {
                            *m += share * p;
                        }
                    }
                }
                mixed
            }
        }
    }
}

/// The attribute and test of an interior node.
pub(crate) fn test_of(node: &Node) -> Option<(usize, Test)> {
    match node {
        Node::Leaf { .. } => None,
        Node::NumericSplit {
            attribute,
            threshold,
            ..
        } => Some((
            attribute.index(),
            Test::Numeric {
                threshold: *threshold,
            },
        )),
        Node::NominalSplit { attribute, .. } => Some((attribute.index(), Test::Nominal)),
        Node::BinarySplit {
            attribute, value, ..
        } => Some((attribute.index(), Test::Binary { value: *value })),
    }
}

fn normalize(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total > 0.0 {
        counts.iter().map(|c| c / total).collect()
    } else {
        vec![1.0 / counts.len().max(1) as f64; counts.len()]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dataset::Attribute;
    use crate::node::AttributeIndex;

    /// Hand-built tree: `x < 5` -> a (3/0); else colour: red -> b (2/1), green -> empty, blue -> a (1/0).
    pub(crate) fn hand_tree() -> DecisionTree {
        let header = Header::new(
            "hand",
            vec![
                Attribute::numeric("x"),
                Attribute::nominal(
                    "colour",
                    vec!["red".into(), "green".into(), "blue".into()],
                ),
            ],
            Attribute::nominal("class", vec!["a".into(), "b".into()]),
        )
        .unwrap();
        let nodes = vec![
            Node::NumericSplit {
                attribute: AttributeIndex::new(0),
                threshold: 5.0,
                left: NodeIndex::new(1),
                right: NodeIndex::new(2),
                distribution: vec![5.0, 2.0],
            },
            Node::Leaf {
                distribution: vec![3.0, 0.0],
            },
            Node::NominalSplit {
                attribute: AttributeIndex::new(1),
                children: vec![NodeIndex::new(3), NodeIndex::new(4), NodeIndex::new(5)],
                distribution: vec![2.0, 2.0],
            },
            Node::Leaf {
                distribution: vec![1.0, 2.0],
            },
            Node::Leaf {
                distribution: vec![0.0, 0.0],
            },
            Node::Leaf {
                distribution: vec![1.0, 0.0],
            },
        ];
        DecisionTree { nodes, header }
    }

    #[test]
    fn counts_and_depth() {
        let tree = hand_tree();
        assert_eq!(tree.n_nodes(), 6);
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.depth(), 2);
        assert!((tree.training_error() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn classify_follows_less_than_left() {
        let tree = hand_tree();
        assert_eq!(tree.classify(&[Value::Numeric(4.9), Value::Missing]).unwrap(), 0);
        assert_eq!(
            tree.classify(&[Value::Numeric(5.0), Value::Nominal(0)]).unwrap(),
            1
        );
        assert_eq!(
            tree.classify(&[Value::Numeric(5.0), Value::Nominal(2)]).unwrap(),
            0
        );
    }

    #[test]
    fn empty_leaf_uses_parent_distribution() {
        let tree = hand_tree();
        let p = tree
            .distribution_for(&[Value::Numeric(7.0), Value::Nominal(1)])
            .unwrap();
        assert_eq!(p, vec![0.5, 0.5]);
    }

    #[test]
    fn missing_value_mixes_branches() {
        let tree = hand_tree();
        // 3/7 of the weight goes left (all a), 4/7 right where colour is missing too.
        let p = tree.distribution_for(&[Value::Missing, Value::Missing]).unwrap();
        let right_a = (3.0 / 4.0) * (1.0 / 3.0) + (1.0 / 4.0) * 1.0;
        let expected_a = 3.0 / 7.0 + 4.0 / 7.0 * right_a;
        assert!((p[0] - expected_a).abs() < 1e-12, "p = {p:?}");
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn prediction_value_mismatch() {
        let err = hand_tree().classify(&[Value::Missing]).unwrap_err();
        assert!(matches!(
            err,
            LearnError::PredictionValueMismatch { expected: 2, got: 1 }
        ));
    }
}
