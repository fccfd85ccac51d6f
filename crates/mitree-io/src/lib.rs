//! Dataset readers and artifact writers for meta induction trees.
//!
//! Datasets come from ARFF ([`ArffReader`]) or headed CSV
//! ([`CsvDatasetReader`]); [`read_dataset`] picks the reader from the file
//! extension. [`ResultWriter`] puts every artifact of a run into one
//! directory under a common experiment prefix.

mod arff;
mod csv_table;
mod domain;
mod error;
mod writer;

use std::path::Path;

use mitree_learn::Dataset;

pub use arff::{ArffReader, to_arff};
pub use csv_table::{CsvDatasetReader, write_csv};
pub use domain::{DatasetFormat, ExperimentName};
pub use error::IoError;
pub use writer::ResultWriter;

/// Read `path` as ARFF or CSV according to its extension.
///
/// `class` names the class attribute; `None` picks the last column.
///
/// # Errors
///
/// Any error of [`ArffReader::read`] or [`CsvDatasetReader::read`].
pub fn read_dataset(path: &Path, class: Option<&str>) -> Result<Dataset, IoError> {
    match DatasetFormat::from_path(path) {
        DatasetFormat::Arff => {
            let reader = ArffReader::new(path);
            match class {
                Some(name) => reader.with_class(name).read(),
                None => reader.read(),
            }
        }
        DatasetFormat::Csv => {
            let reader = CsvDatasetReader::new(path);
            match class {
                Some(name) => reader.with_class(name).read(),
                None => reader.read(),
            }
        }
    }
}
