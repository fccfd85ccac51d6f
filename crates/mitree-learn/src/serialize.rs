//! Model serialization and deserialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::LearnError;
use crate::tree::DecisionTree;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of nodes in the tree.
    n_nodes: usize,
    /// Number of predictor attributes the tree was trained on.
    n_attributes: usize,
    /// Number of classes.
    n_classes: usize,
    /// The serialized tree, header included.
    tree: DecisionTree,
}

impl DecisionTree {
    /// Save the tree to a binary file.
    ///
    /// Uses bincode encoding wrapped in a versioned envelope for
    /// forward-compatibility checking.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LearnError::SerializeModel`] | bincode encoding failed |
    /// | [`LearnError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LearnError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_nodes: self.n_nodes(),
            n_attributes: self.header.n_attributes(),
            n_classes: self.header.n_classes(),
            tree: self.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| LearnError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| LearnError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_nodes = self.n_nodes(),
            "model saved"
        );

        Ok(())
    }

    /// Load a tree from a binary file.
    ///
    /// Checks the format version and returns an error on mismatch.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LearnError::ReadModel`] | file read failed |
    /// | [`LearnError::DeserializeModel`] | bincode decoding failed |
    /// | [`LearnError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LearnError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| LearnError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| LearnError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(LearnError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_nodes = envelope.n_nodes,
            n_attributes = envelope.n_attributes,
            n_classes = envelope.n_classes,
            "model loaded"
        );

        Ok(envelope.tree)
    }
}
