use std::fmt;

/// Zero-based predictor attribute index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct AttributeIndex(usize);

impl AttributeIndex {
    /// Create a new attribute index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based attribute index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AttributeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root of every arena.
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Every variant carries the weighted class counts of the training data that
/// reached it (not normalized), so a leaf's support is the sum of its
/// distribution and its training error is the sum minus the largest entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// A terminal leaf node.
    Leaf {
        /// Weighted class counts.
        distribution: Vec<f64>,
    },
    /// Binary test on a numeric attribute: `value < threshold` goes left.
    NumericSplit {
        /// Attribute tested.
        attribute: AttributeIndex,
        /// Split point.
        threshold: f64,
        /// Child for `value < threshold`.
        left: NodeIndex,
        /// Child for `value >= threshold`.
        right: NodeIndex,
        /// Weighted class counts.
        distribution: Vec<f64>,
    },
    /// Multiway test on a nominal attribute, one child per label.
    NominalSplit {
        /// Attribute tested.
        attribute: AttributeIndex,
        /// Children in label order.
        children: Vec<NodeIndex>,
        /// Weighted class counts.
        distribution: Vec<f64>,
    },
    /// Binary test on a nominal attribute: `value == label` goes left.
    BinarySplit {
        /// Attribute tested.
        attribute: AttributeIndex,
        /// Label index compared against.
        value: usize,
        /// Child for `value == label`.
        left: NodeIndex,
        /// Child for every other label.
        right: NodeIndex,
        /// Weighted class counts.
        distribution: Vec<f64>,
    },
}

impl Node {
    /// Return the weighted class counts stored at this node.
    #[must_use]
    pub fn distribution(&self) -> &[f64] {
        match self {
            Node::Leaf { distribution }
            | Node::NumericSplit { distribution, .. }
            | Node::NominalSplit { distribution, .. }
            | Node::BinarySplit { distribution, .. } => distribution,
        }
    }

    /// Total training weight that reached this node.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.distribution().iter().sum()
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// The tested attribute, `None` for leaves.
    #[must_use]
    pub fn attribute(&self) -> Option<AttributeIndex> {
        match self {
            Node::Leaf { .. } => None,
            Node::NumericSplit { attribute, .. }
            | Node::NominalSplit { attribute, .. }
            | Node::BinarySplit { attribute, .. } => Some(*attribute),
        }
    }

    /// Child indices in branch order (empty for leaves).
    #[must_use]
    pub fn children(&self) -> Vec<NodeIndex> {
        match self {
            Node::Leaf { .. } => Vec::new(),
            Node::NumericSplit { left, right, .. } | Node::BinarySplit { left, right, .. } => {
                vec![*left, *right]
            }
            Node::NominalSplit { children, .. } => children.clone(),
        }
    }
}

/// Index of the first largest entry; 0 for an empty slice.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{AttributeIndex, Node, NodeIndex, argmax};

    // --- AttributeIndex ---

    #[test]
    fn attribute_index_roundtrip() {
        let ai = AttributeIndex::new(7);
        assert_eq!(ai.index(), 7);
        assert_eq!(format!("{ai}"), "7");
    }

    #[test]
    fn attribute_index_ordering() {
        assert!(AttributeIndex::new(1) < AttributeIndex::new(5));
    }

    // --- NodeIndex ---

    #[test]
    fn node_index_roundtrip() {
        let ni = NodeIndex::new(42);
        assert_eq!(ni.index(), 42);
        assert_eq!(format!("{ni}"), "42");
        assert_eq!(NodeIndex::ROOT.index(), 0);
    }

    // --- Node ---

    fn make_leaf() -> Node {
        Node::Leaf {
            distribution: vec![1.0, 3.0],
        }
    }

    fn make_split() -> Node {
        Node::NominalSplit {
            attribute: AttributeIndex::new(2),
            children: vec![NodeIndex::new(1), NodeIndex::new(2), NodeIndex::new(3)],
            distribution: vec![4.0, 4.0],
        }
    }

    #[test]
    fn leaf_is_leaf() {
        assert!(make_leaf().is_leaf());
        assert!(make_leaf().children().is_empty());
        assert_eq!(make_leaf().attribute(), None);
    }

    #[test]
    fn split_children_in_order() {
        let split = make_split();
        assert!(!split.is_leaf());
        assert_eq!(
            split.children(),
            vec![NodeIndex::new(1), NodeIndex::new(2), NodeIndex::new(3)]
        );
        assert_eq!(split.attribute(), Some(AttributeIndex::new(2)));
    }

    #[test]
    fn weight_is_distribution_sum() {
        assert!((make_leaf().weight() - 4.0).abs() < f64::EPSILON);
        assert!((make_split().weight() - 8.0).abs() < f64::EPSILON);
    }

    // --- argmax ---

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[2.0, 1.0]), 0);
        assert_eq!(argmax(&[]), 0);
    }
}
