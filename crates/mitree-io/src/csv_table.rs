//! CSV dataset reader with column type inference, and the matching writer.

use std::path::{Path, PathBuf};

use mitree_learn::{Attribute, Dataset, Header, Instance, Value};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a headed CSV file into a [`Dataset`].
///
/// A column is numeric when every non-missing cell parses as a finite
/// number; otherwise it is nominal with labels in order of first
/// appearance. Empty cells and `?` are missing. The class column is the last
/// one unless [`Self::with_class`] names another, and it is always nominal.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoAttributeColumns`] | Fewer than two columns |
/// | [`IoError::UnknownClassColumn`] | Requested class column absent |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::MissingClassValue`] | Class cell empty or `?` |
/// | [`IoError::InvalidDataset`] | Duplicate column names |
pub struct CsvDatasetReader {
    path: PathBuf,
    class: Option<String>,
}

impl CsvDatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            class: None,
        }
    }

    /// Use the column called `name` as the class.
    #[must_use]
    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.class = Some(name.into());
        self
    }

    /// Read, type and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that short rows surface as InconsistentRowLength.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let names: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(str::to_string)
            .collect();
        if names.len() < 2 {
            return Err(IoError::NoAttributeColumns {
                path: self.path.clone(),
            });
        }
        let class_column = match &self.class {
            Some(name) => names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| IoError::UnknownClassColumn {
                    path: self.path.clone(),
                    name: name.clone(),
                })?,
            None => names.len() - 1,
        };
        debug!(n_columns = names.len(), class_column, "read CSV header");

        let mut rows: Vec<Vec<String>> = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != names.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: names.len(),
                    got: record.len(),
                });
            }
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            if is_missing(&row[class_column]) {
                return Err(IoError::MissingClassValue {
                    path: self.path.clone(),
                    row_index,
                });
            }
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let columns: Vec<Column> = names
            .iter()
            .enumerate()
            .map(|(col, name)| Column::infer(name, rows.iter().map(|r| r[col].as_str()), col == class_column))
            .collect();
        let attributes: Vec<Attribute> = columns
            .iter()
            .enumerate()
            .filter(|(col, _)| *col != class_column)
            .map(|(_, c)| c.attribute.clone())
            .collect();
        let relation = self
            .path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let header = Header::new(relation, attributes, columns[class_column].attribute.clone())
            .map_err(|e| self.invalid(e))?;

        let mut data = Dataset::new(header);
        for row in &rows {
            let values = columns
                .iter()
                .zip(row)
                .enumerate()
                .filter(|(col, _)| *col != class_column)
                .map(|(_, (column, raw))| column.value(raw))
                .collect();
            let class = columns[class_column]
                .value(&row[class_column])
                .as_nominal()
                .unwrap_or(0);
            data.push(Instance::new(values, class, 1.0))
                .map_err(|e| self.invalid(e))?;
        }
        info!(
            n_instances = data.len(),
            n_attributes = data.header().n_attributes(),
            n_classes = data.header().n_classes(),
            "CSV dataset loaded"
        );
        Ok(data)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn invalid(&self, e: mitree_learn::LearnError) -> IoError {
        IoError::InvalidDataset {
            path: self.path.clone(),
            source: e,
        }
    }
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw == "?"
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

struct Column {
    attribute: Attribute,
}

impl Column {
    fn infer<'a>(name: &str, cells: impl Iterator<Item = &'a str> + Clone, force_nominal: bool) -> Self {
        let present = cells.filter(|c| !is_missing(c));
        let numeric = !force_nominal && present.clone().all(|c| parse_finite(c).is_some());
        if numeric {
            return Self {
                attribute: Attribute::numeric(name),
            };
        }
        let mut labels: Vec<String> = Vec::new();
        for cell in present {
            if !labels.iter().any(|l| l == cell) {
                labels.push(cell.to_string());
            }
        }
        Self {
            attribute: Attribute::nominal(name, labels),
        }
    }

    fn value(&self, raw: &str) -> Value {
        if is_missing(raw) {
            return Value::Missing;
        }
        if self.attribute.is_numeric() {
            return parse_finite(raw).map_or(Value::Missing, Value::Numeric);
        }
        self.attribute
            .value_index(raw)
            .map_or(Value::Missing, Value::Nominal)
    }
}

/// Write `data` as CSV: predictors, the class, then a `weight` column.
///
/// Missing values are written as `?`.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be created or written.
#[instrument(skip(data), fields(path = %path.display(), n_instances = data.len()))]
pub fn write_csv(data: &Dataset, path: &Path) -> Result<(), IoError> {
    let write_error = |e: csv::Error| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e.into(),
    };
    let header = data.header();
    let mut wtr = csv::Writer::from_path(path).map_err(write_error)?;

    let mut names: Vec<&str> = header.attributes().iter().map(Attribute::name).collect();
    names.push(header.class_attribute().name());
    names.push("weight");
    wtr.write_record(&names).map_err(write_error)?;

    for instance in data.instances() {
        let mut record: Vec<String> = instance
            .values()
            .iter()
            .enumerate()
            .map(|(index, value)| header.format_value(index, value))
            .collect();
        record.push(header.class_label(instance.class()).to_string());
        record.push(instance.weight().to_string());
        wtr.write_record(&record).map_err(write_error)?;
    }
    wtr.flush().map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("CSV dataset written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_csv_file(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    // --- Type inference ---

    #[test]
    fn numeric_and_nominal_columns_inferred() {
        let f = write_csv_file("temp,sky,play\n21.5,sunny,yes\n?,rain,no\n18,sunny,no\n");
        let ds = CsvDatasetReader::new(f.path()).read().unwrap();
        let header = ds.header();
        assert!(header.attribute(0).is_numeric());
        assert_eq!(header.attribute(1).values(), ["sunny", "rain"]);
        assert_eq!(header.class_values(), ["yes", "no"]);
        assert_eq!(ds.instances()[1].values(), [Value::Missing, Value::Nominal(1)]);
        assert_eq!(ds.instances()[2].class(), 1);
    }

    #[test]
    fn mixed_column_is_nominal() {
        let f = write_csv_file("code,c\n1,a\nx2,b\n1,a\n");
        let ds = CsvDatasetReader::new(f.path()).read().unwrap();
        assert_eq!(ds.header().attribute(0).values(), ["1", "x2"]);
    }

    #[test]
    fn numeric_looking_class_is_nominal() {
        let f = write_csv_file("x,grade\n0.5,3\n0.7,1\n");
        let ds = CsvDatasetReader::new(f.path()).read().unwrap();
        assert_eq!(ds.header().class_values(), ["3", "1"]);
    }

    #[test]
    fn class_column_by_name() {
        let f = write_csv_file("play,temp\nyes,20\nno,30\n");
        let ds = CsvDatasetReader::new(f.path()).with_class("play").read().unwrap();
        assert_eq!(ds.header().class_attribute().name(), "play");
        assert_eq!(ds.header().attribute(0).name(), "temp");
        assert_eq!(ds.instances()[1].values(), [Value::Numeric(30.0)]);
    }

    // --- Validation ---

    #[test]
    fn unknown_class_column() {
        let f = write_csv_file("a,b\n1,x\n");
        let err = CsvDatasetReader::new(f.path()).with_class("z").read().unwrap_err();
        assert!(matches!(err, IoError::UnknownClassColumn { .. }));
    }

    #[test]
    fn single_column_rejected() {
        let f = write_csv_file("only\nx\n");
        let err = CsvDatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::NoAttributeColumns { .. }));
    }

    #[test]
    fn header_only_is_empty() {
        let f = write_csv_file("a,b\n");
        let err = CsvDatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn ragged_row_rejected() {
        let f = write_csv_file("a,b,c\n1,2,x\n1,y\n");
        let err = CsvDatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. }));
    }

    #[test]
    fn missing_class_rejected() {
        let f = write_csv_file("a,c\n1,x\n2,?\n");
        let err = CsvDatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::MissingClassValue { row_index: 1, .. }));
    }

    #[test]
    fn duplicate_column_names_rejected() {
        let f = write_csv_file("a,a,c\n1,2,x\n");
        let err = CsvDatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InvalidDataset { .. }));
    }

    #[test]
    fn nonexistent_file() {
        let err = CsvDatasetReader::new(Path::new("/nonexistent/data.csv")).read().unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    // --- Writing ---

    #[test]
    fn written_csv_has_weight_column() {
        let f = write_csv_file("temp,sky,play\n21.5,sunny,yes\n?,rain,no\n");
        let ds = CsvDatasetReader::new(f.path()).read().unwrap();
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.csv");
        write_csv(&ds, &out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text, "temp,sky,play,weight\n21.5,sunny,yes,1\n?,rain,no,1\n");
    }
}
