//! ARFF reading and writing for numeric and nominal attributes.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use mitree_learn::{Attribute, AttributeKind, Dataset, Header, Instance, Value};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a dense ARFF file into a [`Dataset`].
///
/// Supported: `@relation`, `@attribute` with `numeric`, `real`, `integer` or
/// a `{label,...}` set, `@data` rows with `?` for missing values and an
/// optional `{weight}` suffix. `%` starts a comment line. The class is the
/// last attribute unless [`Self::with_class`] names another.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::ArffParse`] | Malformed declaration, sparse row or bad weight |
/// | [`IoError::UnsupportedAttributeType`] | `string`, `date` or `relational` attribute |
/// | [`IoError::NoAttributeColumns`] | Fewer than two attributes |
/// | [`IoError::UnknownClassColumn`] | Requested class attribute absent |
/// | [`IoError::NumericClassColumn`] | Class attribute is numeric |
/// | [`IoError::EmptyDataset`] | No data rows |
/// | [`IoError::InconsistentRowLength`] | Row has a different cell count than declared |
/// | [`IoError::NonFiniteValue`] | Numeric cell is NaN, Inf or unparseable |
/// | [`IoError::UndeclaredNominalValue`] | Nominal cell outside the declared labels |
/// | [`IoError::MissingClassValue`] | Row has `?` as class |
pub struct ArffReader {
    path: PathBuf,
    class: Option<String>,
}

struct RawRow {
    cells: Vec<Cell>,
    weight: f64,
}

/// One comma-separated field. A quoted `?` is a label, not a missing value.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    text: String,
    quoted: bool,
}

impl Cell {
    fn is_missing(&self) -> bool {
        !self.quoted && self.text == "?"
    }
}

impl ArffReader {
    /// Create a new reader for the given ARFF file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            class: None,
        }
    }

    /// Use the attribute called `name` as the class.
    #[must_use]
    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.class = Some(name.into());
        self
    }

    /// Read and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        self.parse(&text)
    }

    fn parse(&self, text: &str) -> Result<Dataset, IoError> {
        let mut relation = self
            .path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let mut columns: Vec<Attribute> = Vec::new();
        let mut rows: Vec<RawRow> = Vec::new();
        let mut in_data = false;

        for (line_index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let line_no = line_index + 1;
            if in_data {
                rows.push(self.data_row(line, line_no)?);
                continue;
            }
            let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            match keyword.to_ascii_lowercase().as_str() {
                "@relation" => relation = unquote(rest.trim()).into_owned(),
                "@attribute" => columns.push(self.attribute(rest.trim(), line_no)?),
                "@data" => in_data = true,
                _ => {
                    return Err(self.parse_error(line_no, format!("unexpected line \"{line}\"")));
                }
            }
        }
        debug!(n_columns = columns.len(), n_rows = rows.len(), "ARFF parsed");

        let (header, class_column) = self.header(relation, columns)?;
        let dataset = self.dataset(header, class_column, rows)?;
        info!(
            n_instances = dataset.len(),
            n_attributes = dataset.header().n_attributes(),
            n_classes = dataset.header().n_classes(),
            "ARFF dataset loaded"
        );
        Ok(dataset)
    }

    fn parse_error(&self, line: usize, message: String) -> IoError {
        IoError::ArffParse {
            path: self.path.clone(),
            line,
            message,
        }
    }

    fn attribute(&self, declaration: &str, line: usize) -> Result<Attribute, IoError> {
        let (name, kind) = split_name(declaration)
            .ok_or_else(|| self.parse_error(line, "attribute without a type".into()))?;
        if let Some(body) = kind.strip_prefix('{') {
            let body = body
                .strip_suffix('}')
                .ok_or_else(|| self.parse_error(line, format!("unterminated label set for \"{name}\"")))?;
            let labels: Vec<String> = split_cells(body).into_iter().map(|c| c.text).collect();
            if labels.iter().any(String::is_empty) {
                return Err(self.parse_error(line, format!("empty label in \"{name}\"")));
            }
            return Ok(Attribute::nominal(name, labels));
        }
        match kind.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => Ok(Attribute::numeric(name)),
            _ => Err(IoError::UnsupportedAttributeType {
                path: self.path.clone(),
                attribute: name,
                kind: kind.to_string(),
            }),
        }
    }

    fn data_row(&self, line: &str, line_no: usize) -> Result<RawRow, IoError> {
        if line.starts_with('{') {
            return Err(self.parse_error(line_no, "sparse rows are not supported".into()));
        }
        let (cells, weight) = match line.strip_suffix('}').and_then(|s| s.rsplit_once('{')) {
            Some((cells, weight)) => {
                let weight: f64 = weight
                    .trim()
                    .parse()
                    .map_err(|_| self.parse_error(line_no, format!("bad instance weight \"{weight}\"")))?;
                (cells.trim_end().trim_end_matches(','), weight)
            }
            None => (line, 1.0),
        };
        Ok(RawRow {
            cells: split_cells(cells),
            weight,
        })
    }

    fn header(&self, relation: String, mut columns: Vec<Attribute>) -> Result<(Header, usize), IoError> {
        if columns.len() < 2 {
            return Err(IoError::NoAttributeColumns {
                path: self.path.clone(),
            });
        }
        let class_column = match &self.class {
            Some(name) => columns
                .iter()
                .position(|a| a.name() == name.as_str())
                .ok_or_else(|| IoError::UnknownClassColumn {
                    path: self.path.clone(),
                    name: name.clone(),
                })?,
            None => columns.len() - 1,
        };
        let class = columns.remove(class_column);
        if class.is_numeric() {
            return Err(IoError::NumericClassColumn {
                path: self.path.clone(),
                name: class.name().to_string(),
            });
        }
        let header = Header::new(relation, columns, class).map_err(|e| IoError::InvalidDataset {
            path: self.path.clone(),
            source: e,
        })?;
        Ok((header, class_column))
    }

    fn dataset(&self, header: Header, class_column: usize, rows: Vec<RawRow>) -> Result<Dataset, IoError> {
        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        let expected = header.n_attributes() + 1;
        let mut data = Dataset::new(header);
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.cells.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: row.cells.len(),
                });
            }
            let mut cells = row.cells;
            let class_raw = cells.remove(class_column);
            let header = data.header();
            if class_raw.is_missing() {
                return Err(IoError::MissingClassValue {
                    path: self.path.clone(),
                    row_index,
                });
            }
            let class = header
                .class_index(&class_raw.text)
                .ok_or_else(|| IoError::UndeclaredNominalValue {
                    path: self.path.clone(),
                    row_index,
                    attribute: header.class_attribute().name().to_string(),
                    value: class_raw.text.clone(),
                })?;
            let values = cells
                .iter()
                .enumerate()
                .map(|(col_index, cell)| self.cell(header.attribute(col_index), cell, row_index, col_index))
                .collect::<Result<Vec<_>, _>>()?;
            data.push(Instance::new(values, class, row.weight))
                .map_err(|e| IoError::InvalidDataset {
                    path: self.path.clone(),
                    source: e,
                })?;
        }
        Ok(data)
    }

    fn cell(&self, attribute: &Attribute, cell: &Cell, row_index: usize, col_index: usize) -> Result<Value, IoError> {
        if cell.is_missing() {
            return Ok(Value::Missing);
        }
        let raw = cell.text.as_str();
        match attribute.kind() {
            AttributeKind::Numeric => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Value::Numeric(v)),
                _ => Err(IoError::NonFiniteValue {
                    path: self.path.clone(),
                    row_index,
                    col_index,
                    raw: raw.to_string(),
                }),
            },
            AttributeKind::Nominal { .. } => attribute
                .value_index(raw)
                .map(Value::Nominal)
                .ok_or_else(|| IoError::UndeclaredNominalValue {
                    path: self.path.clone(),
                    row_index,
                    attribute: attribute.name().to_string(),
                    value: raw.to_string(),
                }),
        }
    }
}

/// Split `name type` where the name may be quoted.
fn split_name(declaration: &str) -> Option<(String, &str)> {
    let quote = declaration.chars().next().filter(|c| *c == '\'' || *c == '"');
    let (name, rest) = match quote {
        Some(q) => {
            let end = declaration[1..].find(q)? + 1;
            (declaration[1..end].to_string(), &declaration[end + 1..])
        }
        None => {
            let (name, rest) = declaration.split_once(char::is_whitespace)?;
            (name.to_string(), rest)
        }
    };
    let kind = rest.trim();
    (!kind.is_empty()).then_some((name, kind))
}

/// Comma-separated cells; quotes group, backslash escapes inside quotes.
fn split_cells(s: &str) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut quote: Option<char> = None;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') if current.trim().is_empty() => {
                current.clear();
                quoted = true;
                quote = Some(c);
            }
            (None, ',') => cells.push(Cell {
                text: std::mem::take(&mut current).trim().to_string(),
                quoted: std::mem::take(&mut quoted),
            }),
            (None, c) => current.push(c),
        }
    }
    cells.push(Cell {
        text: current.trim().to_string(),
        quoted,
    });
    cells
}

fn unquote(s: &str) -> Cow<'_, str> {
    match split_cells(s).into_iter().next() {
        Some(cell) if cell.text != s => Cow::Owned(cell.text),
        _ => Cow::Borrowed(s),
    }
}

/// Quote a name or label when ARFF would otherwise misread it.
fn quote(s: &str) -> Cow<'_, str> {
    let needs = s.is_empty()
        || s == "?"
        || s
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '\'' | '"' | '{' | '}' | '%' | '\\'));
    if needs {
        Cow::Owned(format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")))
    } else {
        Cow::Borrowed(s)
    }
}

fn declaration(attribute: &Attribute) -> String {
    match attribute.kind() {
        AttributeKind::Numeric => format!("@attribute {} numeric", quote(attribute.name())),
        AttributeKind::Nominal { .. } => {
            let labels: Vec<Cow<'_, str>> = attribute.values().iter().map(|v| quote(v)).collect();
            format!("@attribute {} {{{}}}", quote(attribute.name()), labels.join(","))
        }
    }
}

/// Render `data` as ARFF with the class as the last attribute.
///
/// Instance weights other than 1 are written as `{w}` suffixes.
#[must_use]
pub fn to_arff(data: &Dataset) -> String {
    let header = data.header();
    let mut out = String::new();
    let _ = writeln!(out, "@relation {}\n", quote(header.relation()));
    for attribute in header.attributes() {
        let _ = writeln!(out, "{}", declaration(attribute));
    }
    let _ = writeln!(out, "{}\n\n@data", declaration(header.class_attribute()));
    for instance in data.instances() {
        for (index, value) in instance.values().iter().enumerate() {
            match value {
                Value::Missing => out.push_str("?,"),
                _ => {
                    let _ = write!(out, "{},", quote(&header.format_value(index, value)));
                }
            }
        }
        let _ = write!(out, "{}", quote(header.class_label(instance.class())));
        if instance.weight() != 1.0 {
            let _ = write!(out, ",{{{}}}", instance.weight());
        }
        out.push('\n');
    }
    out
}
