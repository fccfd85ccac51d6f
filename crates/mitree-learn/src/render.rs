//! Text and Graphviz rendering of fitted trees.
//!
//! Both renderings print leaf weights divided by a caller-supplied divisor.
//! A tree induced from rules of `k` random trees carries roughly `k` times
//! the original training weight, so dividing by `k` shows weights on the
//! scale of the original data.

use std::fmt::Write as _;

use crate::{
    node::{Node, NodeIndex, argmax},
    split::Test,
    tree::{DecisionTree, test_of},
};

impl DecisionTree {
    /// Indented text rendering, one line per branch.
    ///
    /// ```text
    /// outlook = sunny
    /// |   humidity < 77.5: yes (2.00)
    /// |   humidity >= 77.5: no (3.00)
    /// outlook = overcast: yes (4.00)
    /// ```
    ///
    /// Leaves print `class (weight)` or `class (weight/errors)`. A
    /// non-positive `weight_divisor` is treated as 1.
    #[must_use]
    pub fn to_text(&self, weight_divisor: f64) -> String {
        let divisor = effective_divisor(weight_divisor);
        let mut out = String::new();
        let root = self.node(NodeIndex::ROOT);
        if root.is_leaf() {
            let _ = writeln!(out, ": {}", self.leaf_label(root, divisor));
        } else {
            self.write_text(NodeIndex::ROOT, 0, divisor, &mut out);
        }
        let _ = write!(
            out,
            "\nNumber of Leaves  : \t{}\n\nSize of the tree : \t{}\n",
            self.n_leaves(),
            self.n_nodes()
        );
        out
    }

    /// Graphviz DOT rendering of the tree.
    ///
    /// Interior nodes are labelled with the attribute name, edges with the
    /// branch condition and leaves with the same label as [`Self::to_text`].
    #[must_use]
    pub fn to_dot(&self, weight_divisor: f64) -> String {
        let divisor = effective_divisor(weight_divisor);
        let mut out = String::from("digraph MetaInductionTree {\n");
        for (i, node) in self.nodes.iter().enumerate() {
            match node.attribute() {
                None => {
                    let _ = writeln!(
                        out,
                        "N{i} [label=\"{}\" shape=box style=filled ]",
                        escape(&self.leaf_label(node, divisor))
                    );
                }
                Some(attribute) => {
                    let name = self.header.attribute(attribute.index()).name();
                    let _ = writeln!(out, "N{i} [label=\"{}\" ]", escape(name));
                    for (branch, child) in node.children().into_iter().enumerate() {
                        let _ = writeln!(
                            out,
                            "N{i}->N{} [label=\"{}\"]",
                            child.index(),
                            escape(&self.edge_label(node, branch))
                        );
                    }
                }
            }
        }
        out.push_str("}\n");
        out
    }

    fn write_text(&self, index: NodeIndex, depth: usize, divisor: f64, out: &mut String) {
        let node = self.node(index);
        let Some((attribute, _)) = test_of(node) else {
            return;
        };
        let name = self.header.attribute(attribute).name();
        for (branch, child) in node.children().into_iter().enumerate() {
            out.push_str(&"|   ".repeat(depth));
            let _ = write!(out, "{name} {}", self.edge_label(node, branch));
            let child_node = self.node(child);
            if child_node.is_leaf() {
                let _ = writeln!(out, ": {}", self.leaf_label(child_node, divisor));
            } else {
                out.push('\n');
                self.write_text(child, depth + 1, divisor, out);
            }
        }
    }

    /// Condition on branch `branch` of `node`, without the attribute name.
    fn edge_label(&self, node: &Node, branch: usize) -> String {
        let Some((attribute, test)) = test_of(node) else {
            return String::new();
        };
        let attr = self.header.attribute(attribute);
        match test {
            Test::Numeric { threshold } if branch == 0 => format!("< {threshold}"),
            Test::Numeric { threshold } => format!(">= {threshold}"),
            Test::Nominal => format!("= {}", attr.value_label(branch).unwrap_or("?")),
            Test::Binary { value } => {
                let op = if branch == 0 { "=" } else { "!=" };
                format!("{op} {}", attr.value_label(value).unwrap_or("?"))
            }
        }
    }

    fn leaf_label(&self, node: &Node, divisor: f64) -> String {
        let distribution = node.distribution();
        let class = argmax(distribution);
        let weight = node.weight();
        let errors = weight - distribution.get(class).copied().unwrap_or(0.0);
        let label = self.header.class_label(class);
        if errors > 0.0 {
            format!(
                "{label} ({:.2}/{:.2})",
                weight / divisor,
                errors / divisor
            )
        } else {
            format!("{label} ({:.2})", weight / divisor)
        }
    }
}

fn effective_divisor(weight_divisor: f64) -> f64 {
    if weight_divisor.is_finite() && weight_divisor > 0.0 {
        weight_divisor
    } else {
        1.0
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
