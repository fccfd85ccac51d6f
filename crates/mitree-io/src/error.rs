//! I/O error types for mitree-io.

use std::path::PathBuf;

use mitree_learn::LearnError;

/// Errors from dataset parsing and artifact writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an ARFF line cannot be understood.
    #[error("ARFF parse error in {path} at line {line}: {message}")]
    ArffParse {
        /// Path to the ARFF file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// Returned when an ARFF attribute has a type other than numeric or nominal.
    #[error("unsupported type \"{kind}\" for attribute \"{attribute}\" in {path}")]
    UnsupportedAttributeType {
        /// Path to the ARFF file.
        path: PathBuf,
        /// The attribute name.
        attribute: String,
        /// The declared type.
        kind: String,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the file declares columns but holds zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the input file.
        path: PathBuf,
    },

    /// Returned when the file has fewer than two columns (one predictor plus the class).
    #[error("{path} needs at least one attribute column besides the class")]
    NoAttributeColumns {
        /// Path to the input file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than declared.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a numeric cell is NaN, Inf, or not a number.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw cell.
        raw: String,
    },

    /// Returned when a nominal cell is not among the declared labels.
    #[error("undeclared value \"{value}\" for attribute \"{attribute}\" in {path}, row {row_index}")]
    UndeclaredNominalValue {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// The attribute name.
        attribute: String,
        /// The raw cell.
        value: String,
    },

    /// Returned when the requested class column does not exist.
    #[error("no class column \"{name}\" in {path}")]
    UnknownClassColumn {
        /// Path to the input file.
        path: PathBuf,
        /// The requested column name.
        name: String,
    },

    /// Returned when the class column is declared numeric.
    #[error("class column \"{name}\" in {path} must be nominal")]
    NumericClassColumn {
        /// Path to the input file.
        path: PathBuf,
        /// The class column name.
        name: String,
    },

    /// Returned when a row has no class value.
    #[error("missing class value in {path}, row {row_index}")]
    MissingClassValue {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
    },

    /// Returned when the parsed schema or rows are rejected by the dataset model.
    #[error("invalid dataset in {path}")]
    InvalidDataset {
        /// Path to the input file.
        path: PathBuf,
        /// Underlying dataset error.
        source: LearnError,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact cannot be serialized to JSON.
    #[error("cannot serialize {path}")]
    Serialize {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
