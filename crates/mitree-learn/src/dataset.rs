//! Typed tabular data: attributes, values, weighted instances and datasets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LearnError;

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// One label out of a fixed, ordered label set.
    Nominal {
        /// Labels in declaration order; values refer to them by index.
        values: Vec<String>,
    },
    /// A real number.
    Numeric,
}

/// A named, typed column of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
}

impl Attribute {
    /// Declare a nominal attribute with the given label set.
    pub fn nominal(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal { values },
        }
    }

    /// Declare a numeric attribute.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }

    #[must_use]
    pub fn is_nominal(&self) -> bool {
        !self.is_numeric()
    }

    /// Labels of a nominal attribute; empty for numeric attributes.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match &self.kind {
            AttributeKind::Nominal { values } => values,
            AttributeKind::Numeric => &[],
        }
    }

    /// Number of nominal labels (0 for numeric attributes).
    #[must_use]
    pub fn n_values(&self) -> usize {
        self.values().len()
    }

    /// Index of a nominal label, if declared.
    #[must_use]
    pub fn value_index(&self, label: &str) -> Option<usize> {
        self.values().iter().position(|v| v == label)
    }

    /// Label for a nominal value index.
    #[must_use]
    pub fn value_label(&self, index: usize) -> Option<&str> {
        self.values().get(index).map(String::as_str)
    }

    /// Whether `value` is a legal value for this attribute.
    pub(crate) fn accepts(&self, value: &Value) -> bool {
        match (value, &self.kind) {
            (Value::Missing, _) => true,
            (Value::Nominal(i), AttributeKind::Nominal { values }) => *i < values.len(),
            (Value::Numeric(_), AttributeKind::Numeric) => true,
            _ => false,
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Unknown value.
    Missing,
    /// Index into the attribute's nominal label set.
    Nominal(usize),
    /// Numeric value.
    Numeric(f64),
}

impl Value {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    #[must_use]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_nominal(&self) -> Option<usize> {
        match self {
            Value::Nominal(i) => Some(*i),
            _ => None,
        }
    }
}

/// One weighted, labelled row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub(crate) values: Vec<Value>,
    pub(crate) class: usize,
    pub(crate) weight: f64,
}

impl Instance {
    /// Create an instance. Validation happens in [`Dataset::push`].
    pub fn new(values: Vec<Value>, class: usize, weight: f64) -> Self {
        Self {
            values,
            class,
            weight,
        }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of attribute `attribute`; `Missing` when out of range.
    #[must_use]
    pub fn value(&self, attribute: usize) -> Value {
        self.values.get(attribute).copied().unwrap_or(Value::Missing)
    }

    /// Zero-based index into the class label set.
    #[must_use]
    pub fn class(&self) -> usize {
        self.class
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Schema of a dataset: predictor attributes plus a nominal class attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    relation: String,
    attributes: Vec<Attribute>,
    class_attribute: Attribute,
}

impl Header {
    /// Create a validated header.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LearnError::ZeroAttributes`] | `attributes` is empty |
    /// | [`LearnError::InvalidClassAttribute`] | class is numeric or has no labels |
    /// | [`LearnError::DuplicateAttribute`] | two columns (class included) share a name |
    pub fn new(
        relation: impl Into<String>,
        attributes: Vec<Attribute>,
        class_attribute: Attribute,
    ) -> Result<Self, LearnError> {
        if attributes.is_empty() {
            return Err(LearnError::ZeroAttributes);
        }
        if class_attribute.n_values() == 0 {
            return Err(LearnError::InvalidClassAttribute {
                name: class_attribute.name.clone(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for name in attributes
            .iter()
            .chain(std::iter::once(&class_attribute))
            .map(Attribute::name)
        {
            if !seen.insert(name) {
                return Err(LearnError::DuplicateAttribute {
                    name: name.to_string(),
                });
            }
        }
        Ok(Self {
            relation: relation.into(),
            attributes,
            class_attribute,
        })
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Predictor attributes, class excluded.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Predictor attribute at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= n_attributes()`.
    #[must_use]
    pub fn attribute(&self, index: usize) -> &Attribute {
        &self.attributes[index]
    }

    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// Position of a predictor attribute by name.
    #[must_use]
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    #[must_use]
    pub fn class_attribute(&self) -> &Attribute {
        &self.class_attribute
    }

    #[must_use]
    pub fn class_values(&self) -> &[String] {
        self.class_attribute.values()
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_attribute.n_values()
    }

    /// Index of a class label, if declared.
    #[must_use]
    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.class_attribute.value_index(label)
    }

    /// Label for a class index; `"?"` when out of range.
    #[must_use]
    pub fn class_label(&self, class: usize) -> &str {
        self.class_attribute.value_label(class).unwrap_or("?")
    }

    /// Render a value of predictor `attribute` the way it appears in data files.
    #[must_use]
    pub fn format_value(&self, attribute: usize, value: &Value) -> String {
        match value {
            Value::Missing => "?".to_string(),
            Value::Nominal(i) => self
                .attributes
                .get(attribute)
                .and_then(|a| a.value_label(*i))
                .unwrap_or("?")
                .to_string(),
            Value::Numeric(v) => format!("{v}"),
        }
    }
}

/// An ordered, validated collection of weighted instances.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    header: Header,
    instances: Vec<Instance>,
}

impl Dataset {
    /// Create an empty dataset with the given schema.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            instances: Vec::new(),
        }
    }

    /// Append an instance after checking it against the header.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LearnError::ValueCountMismatch`] | value count differs from the attribute count |
    /// | [`LearnError::ValueKindMismatch`] | value kind or nominal index does not fit the attribute |
    /// | [`LearnError::NonFiniteValue`] | numeric value is NaN or infinite |
    /// | [`LearnError::UnknownClass`] | class index outside the class label set |
    /// | [`LearnError::InvalidWeight`] | weight negative or not finite |
    pub fn push(&mut self, instance: Instance) -> Result<(), LearnError> {
        let instance_index = self.instances.len();
        let expected = self.header.n_attributes();
        if instance.values.len() != expected {
            return Err(LearnError::ValueCountMismatch {
                expected,
                got: instance.values.len(),
                instance_index,
            });
        }
        for (attribute, value) in self.header.attributes.iter().zip(&instance.values) {
            if !attribute.accepts(value) {
                return Err(LearnError::ValueKindMismatch {
                    instance_index,
                    attribute: attribute.name.clone(),
                });
            }
            if let Value::Numeric(v) = value
                && !v.is_finite()
            {
                return Err(LearnError::NonFiniteValue {
                    instance_index,
                    attribute: attribute.name.clone(),
                });
            }
        }
        let n_classes = self.header.n_classes();
        if instance.class >= n_classes {
            return Err(LearnError::UnknownClass {
                instance_index,
                class: instance.class,
                n_classes,
            });
        }
        if !instance.weight.is_finite() || instance.weight < 0.0 {
            return Err(LearnError::InvalidWeight {
                instance_index,
                weight: instance.weight,
            });
        }
        self.instances.push(instance);
        Ok(())
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Total instance weight.
    #[must_use]
    pub fn sum_of_weights(&self) -> f64 {
        self.instances.iter().map(|i| i.weight).sum()
    }

    /// Total instance weight per class, indexed like the class label set.
    #[must_use]
    pub fn class_weights(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.header.n_classes()];
        for instance in &self.instances {
            totals[instance.class] += instance.weight;
        }
        totals
    }

    /// Empty dataset sharing this schema.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::new(self.header.clone())
    }

    /// Copy of the instances at `indices`, in the given order.
    ///
    /// # Panics
    ///
    /// Panics when an index is out of bounds.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            header: self.header.clone(),
            instances: indices.iter().map(|&i| self.instances[i].clone()).collect(),
        }
    }

    /// Fail with [`LearnError::EmptyDataset`] when there is nothing to learn from.
    pub(crate) fn require_instances(&self) -> Result<(), LearnError> {
        if self.instances.is_empty() {
            return Err(LearnError::EmptyDataset {
                relation: self.header.relation.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} instances, {} attributes, {} classes)",
            self.header.relation,
            self.instances.len(),
            self.header.n_attributes(),
            self.header.n_classes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn header() -> Header {
        Header::new(
            "toy",
            vec![
                Attribute::nominal("outlook", labels(&["sunny", "rainy"])),
                Attribute::numeric("temp"),
            ],
            Attribute::nominal("play", labels(&["yes", "no"])),
        )
        .unwrap()
    }

    // --- Header ---

    #[test]
    fn header_lookups() {
        let h = header();
        assert_eq!(h.n_attributes(), 2);
        assert_eq!(h.attribute_index("temp"), Some(1));
        assert_eq!(h.attribute_index("play"), None);
        assert_eq!(h.class_index("no"), Some(1));
        assert_eq!(h.class_label(0), "yes");
        assert_eq!(h.class_label(9), "?");
    }

    #[test]
    fn header_rejects_numeric_class() {
        let err = Header::new("x", vec![Attribute::numeric("a")], Attribute::numeric("c"))
            .unwrap_err();
        assert!(matches!(err, LearnError::InvalidClassAttribute { .. }));
    }

    #[test]
    fn header_rejects_duplicate_names() {
        let err = Header::new(
            "x",
            vec![Attribute::numeric("a"), Attribute::numeric("a")],
            Attribute::nominal("c", labels(&["y"])),
        )
        .unwrap_err();
        assert!(matches!(err, LearnError::DuplicateAttribute { name } if name == "a"));
    }

    #[test]
    fn header_rejects_class_named_like_attribute() {
        let err = Header::new(
            "x",
            vec![Attribute::numeric("c")],
            Attribute::nominal("c", labels(&["y"])),
        )
        .unwrap_err();
        assert!(matches!(err, LearnError::DuplicateAttribute { .. }));
    }

    #[test]
    fn header_rejects_zero_attributes() {
        let err = Header::new("x", vec![], Attribute::nominal("c", labels(&["y"]))).unwrap_err();
        assert!(matches!(err, LearnError::ZeroAttributes));
    }

    #[test]
    fn format_value_renders_labels_and_missing() {
        let h = header();
        assert_eq!(h.format_value(0, &Value::Nominal(1)), "rainy");
        assert_eq!(h.format_value(1, &Value::Numeric(2.5)), "2.5");
        assert_eq!(h.format_value(1, &Value::Missing), "?");
    }

    // --- Dataset ---

    #[test]
    fn push_and_totals() {
        let mut ds = Dataset::new(header());
        ds.push(Instance::new(vec![Value::Nominal(0), Value::Numeric(20.0)], 0, 1.0))
            .unwrap();
        ds.push(Instance::new(vec![Value::Missing, Value::Numeric(25.0)], 1, 2.5))
            .unwrap();
        assert_eq!(ds.len(), 2);
        assert!((ds.sum_of_weights() - 3.5).abs() < 1e-12);
        assert_eq!(ds.class_weights(), vec![1.0, 2.5]);
    }

    #[test]
    fn push_rejects_wrong_value_count() {
        let mut ds = Dataset::new(header());
        let err = ds
            .push(Instance::new(vec![Value::Nominal(0)], 0, 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            LearnError::ValueCountMismatch { expected: 2, got: 1, instance_index: 0 }
        ));
    }

    #[test]
    fn push_rejects_kind_mismatch() {
        let mut ds = Dataset::new(header());
        let err = ds
            .push(Instance::new(vec![Value::Numeric(1.0), Value::Numeric(1.0)], 0, 1.0))
            .unwrap_err();
        assert!(matches!(err, LearnError::ValueKindMismatch { .. }));
    }

    #[test]
    fn push_rejects_out_of_range_label() {
        let mut ds = Dataset::new(header());
        let err = ds
            .push(Instance::new(vec![Value::Nominal(7), Value::Missing], 0, 1.0))
            .unwrap_err();
        assert!(matches!(err, LearnError::ValueKindMismatch { .. }));
    }

    #[test]
    fn push_rejects_unknown_class() {
        let mut ds = Dataset::new(header());
        let err = ds
            .push(Instance::new(vec![Value::Missing, Value::Missing], 2, 1.0))
            .unwrap_err();
        assert!(matches!(err, LearnError::UnknownClass { class: 2, n_classes: 2, .. }));
    }

    #[test]
    fn push_rejects_negative_weight() {
        let mut ds = Dataset::new(header());
        let err = ds
            .push(Instance::new(vec![Value::Missing, Value::Missing], 0, -1.0))
            .unwrap_err();
        assert!(matches!(err, LearnError::InvalidWeight { .. }));
    }

    #[test]
    fn push_rejects_nan() {
        let mut ds = Dataset::new(header());
        let err = ds
            .push(Instance::new(vec![Value::Missing, Value::Numeric(f64::NAN)], 0, 1.0))
            .unwrap_err();
        assert!(matches!(err, LearnError::NonFiniteValue { .. }));
    }

    #[test]
    fn select_and_empty_like() {
        let mut ds = Dataset::new(header());
        for i in 0..4 {
            ds.push(Instance::new(
                vec![Value::Nominal(i % 2), Value::Numeric(i as f64)],
                i % 2,
                1.0,
            ))
            .unwrap();
        }
        let sub = ds.select(&[3, 1]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.instances()[0].value(1), Value::Numeric(3.0));
        assert!(ds.empty_like().is_empty());
        assert!(matches!(
            ds.empty_like().require_instances(),
            Err(LearnError::EmptyDataset { .. })
        ));
    }
}
