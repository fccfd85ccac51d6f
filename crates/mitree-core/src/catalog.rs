use std::collections::BTreeMap;

use mitree_learn::Dataset;
use tracing::debug;

use crate::error::ContractViolation;

/// Range and mean of one numeric attribute over its known values.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AttributeSummary {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// Arithmetic mean of the known values.
    pub mean: f64,
}

/// Per-attribute summaries of the numeric attributes of a dataset.
///
/// Built once from the original training data and read-only afterwards.
/// Bounds the open side of numeric split intervals during rule extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeCatalog {
    summaries: BTreeMap<String, AttributeSummary>,
}

impl AttributeCatalog {
    /// Scan every numeric attribute of `data` once.
    ///
    /// Attributes with no known value get no summary.
    #[must_use]
    pub fn build(data: &Dataset) -> Self {
        let header = data.header();
        let mut summaries = BTreeMap::new();
        for (index, attribute) in header.attributes().iter().enumerate() {
            if !attribute.is_numeric() {
                continue;
            }
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut sum = 0.0;
            let mut count = 0usize;
            for v in data
                .instances()
                .iter()
                .filter_map(|instance| instance.value(index).as_numeric())
            {
                min = min.min(v);
                max = max.max(v);
                sum += v;
                count += 1;
            }
            if count == 0 {
                debug!(attribute = attribute.name(), "numeric attribute has no known values");
                continue;
            }
            summaries.insert(
                attribute.name().to_string(),
                AttributeSummary {
                    name: attribute.name().to_string(),
                    min,
                    max,
                    mean: sum / count as f64,
                },
            );
        }
        Self { summaries }
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&AttributeSummary> {
        self.summaries.get(name)
    }

    /// Like [`Self::lookup`], but a miss is a [`ContractViolation::MissingSummary`].
    pub(crate) fn require(&self, name: &str) -> Result<&AttributeSummary, ContractViolation> {
        self.lookup(name)
            .ok_or_else(|| ContractViolation::MissingSummary {
                attribute: name.to_string(),
            })
    }

    /// Summaries in attribute-name order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeSummary> {
        self.summaries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}
