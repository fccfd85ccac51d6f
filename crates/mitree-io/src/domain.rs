//! Domain types for mitree-io.

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Experiment name derived from a dataset's relation name.
    ///
    /// Characters outside `[a-zA-Z0-9_-]` become `_`; an empty relation
    /// becomes `mit`.
    #[must_use]
    pub fn from_relation(relation: &str) -> Self {
        let name: String = relation
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if name.is_empty() {
            Self("mit".to_string())
        } else {
            Self(name)
        }
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk format of a dataset written by [`ResultWriter`](crate::ResultWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// ARFF, instance weights in `{w}` suffixes.
    Arff,
    /// CSV with a trailing `weight` column.
    Csv,
}

impl DatasetFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            DatasetFormat::Arff => "arff",
            DatasetFormat::Csv => "csv",
        }
    }

    /// Guess the format from a path's extension; anything but `.csv` is ARFF.
    #[must_use]
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => DatasetFormat::Csv,
            _ => DatasetFormat::Arff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("my-experiment_01".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "my-experiment_01");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        let name = ExperimentName::new("my experiment!".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn relation_names_are_sanitized() {
        assert_eq!(ExperimentName::from_relation("weather.numeric").as_str(), "weather_numeric");
        assert_eq!(ExperimentName::from_relation("").as_str(), "mit");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(DatasetFormat::from_path("a/b.CSV".as_ref()), DatasetFormat::Csv);
        assert_eq!(DatasetFormat::from_path("a/b.arff".as_ref()), DatasetFormat::Arff);
        assert_eq!(DatasetFormat::from_path("a/b".as_ref()), DatasetFormat::Arff);
    }
}
