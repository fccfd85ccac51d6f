//! Artifact writer for induction, evaluation and prediction outputs.

use std::fs;
use std::path::{Path, PathBuf};

use mitree_core::{InductionReport, MitEvaluation};
use mitree_learn::{ClassMetrics, Dataset};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::arff::to_arff;
use crate::csv_table::write_csv;
use crate::domain::{DatasetFormat, ExperimentName};
use crate::IoError;

/// Writes pipeline artifacts into one output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Every file is prefixed with the experiment name:
///
/// | File | Content |
/// |---|---|
/// | `{experiment}_induction.json` | [`InductionReport`] |
/// | `{experiment}_rules.txt` | Scored rules per forest tree |
/// | `{experiment}_tree.txt`, `{experiment}_tree.dot` | The induced tree |
/// | `{experiment}_meta.arff` or `.csv` | The weighted meta dataset |
/// | `{experiment}_evaluate.json` | Cross-validation scores |
/// | `{experiment}_predict.json` | Per-instance predictions |
/// | `{experiment}_model.bin` | Serialized tree (path only) |
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_text(&self, suffix: &str, content: &str) -> Result<PathBuf, IoError> {
        let path = self.path(suffix);
        fs::write(&path, content).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, suffix: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: self.path(suffix),
            source: e,
        })?;
        self.write_text(suffix, &json)
    }

    /// Write the induction report to `{experiment}_induction.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_induction(&self, report: &InductionReport) -> Result<(), IoError> {
        let artifact = InductionArtifact {
            experiment: self.experiment.as_str(),
            n_excluded: report.n_excluded(),
            report,
        };
        let path = self.write_json("induction.json", &artifact)?;
        info!(path = %path.display(), "induction report written");
        Ok(())
    }

    /// Write rendered rule listings to `{experiment}_rules.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_rules(&self, rules: &str) -> Result<(), IoError> {
        let path = self.write_text("rules.txt", rules)?;
        info!(path = %path.display(), "rules written");
        Ok(())
    }

    /// Write the induced tree as text and as Graphviz DOT.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if either file cannot be written.
    #[instrument(skip_all)]
    pub fn write_tree(&self, text: &str, dot: &str) -> Result<(), IoError> {
        self.write_text("tree.txt", text)?;
        let path = self.write_text("tree.dot", dot)?;
        info!(path = %path.display(), "tree written");
        Ok(())
    }

    /// Write the meta dataset to `{experiment}_meta.{arff,csv}`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(format = format.extension(), n_rows = meta.len()))]
    pub fn write_meta_dataset(&self, meta: &Dataset, format: DatasetFormat) -> Result<PathBuf, IoError> {
        let suffix = format!("meta.{}", format.extension());
        let path = match format {
            DatasetFormat::Arff => self.write_text(&suffix, &to_arff(meta))?,
            DatasetFormat::Csv => {
                let path = self.path(&suffix);
                write_csv(meta, &path)?;
                path
            }
        };
        info!(path = %path.display(), "meta dataset written");
        Ok(path)
    }

    /// Write cross-validation results to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_evaluation(&self, evaluation: &MitEvaluation) -> Result<(), IoError> {
        let tree_metrics = evaluation.tree.confusion_matrix.class_metrics();
        let forest_metrics = evaluation.forest.confusion_matrix.class_metrics();
        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            evaluation,
            tree_class_metrics: class_entries(&tree_metrics),
            forest_class_metrics: class_entries(&forest_metrics),
        };
        let path = self.write_json("evaluate.json", &artifact)?;
        info!(path = %path.display(), "evaluation result written");
        Ok(())
    }

    /// Write predictions for `data` to `{experiment}_predict.json`.
    ///
    /// `predicted[i]` is the class index predicted for instance `i`; the
    /// recorded class of each instance is reported alongside.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(n_instances = data.len()))]
    pub fn write_predictions(&self, data: &Dataset, predicted: &[usize]) -> Result<(), IoError> {
        let header = data.header();
        let predictions: Vec<PredictionEntry> = data
            .instances()
            .iter()
            .zip(predicted)
            .enumerate()
            .map(|(index, (instance, &class))| PredictionEntry {
                index,
                actual: header.class_label(instance.class()),
                predicted: header.class_label(class),
            })
            .collect();
        let n_correct = predictions.iter().filter(|p| p.actual == p.predicted).count();
        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            n_instances: predictions.len(),
            accuracy: if predictions.is_empty() {
                0.0
            } else {
                n_correct as f64 / predictions.len() as f64
            },
            predictions,
        };
        let path = self.write_json("predict.json", &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(())
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything; just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.path("model.bin")
    }
}

fn class_entries(metrics: &[ClassMetrics]) -> Vec<ClassEntry<'_>> {
    metrics
        .iter()
        .map(|m| ClassEntry {
            class: &m.class,
            precision: m.precision,
            recall: m.recall,
            f1: m.f1,
            support: m.support,
        })
        .collect()
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct InductionArtifact<'a> {
    experiment: &'a str,
    n_excluded: usize,
    #[serde(flatten)]
    report: &'a InductionReport,
}

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    #[serde(flatten)]
    evaluation: &'a MitEvaluation,
    tree_class_metrics: Vec<ClassEntry<'a>>,
    forest_class_metrics: Vec<ClassEntry<'a>>,
}

#[derive(Serialize)]
struct ClassEntry<'a> {
    class: &'a str,
    precision: f64,
    recall: f64,
    f1: f64,
    support: f64,
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    n_instances: usize,
    accuracy: f64,
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    index: usize,
    actual: &'a str,
    predicted: &'a str,
}
