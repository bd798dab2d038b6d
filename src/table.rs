use std::fs::File;
use std::io::{BufReader, Read};

use camino::Utf8Path;
use csv::{ReaderBuilder, WriterBuilder};
use tracing::warn;

use crate::error::EnaError;
use crate::store::Store;

pub const TSV: u8 = b'\t';
pub const CSV: u8 = b',';

/// In-memory delimited table with an explicit, ordered schema.
///
/// Every row holds exactly one cell per column; a value the source did not
/// provide is the empty string. Column names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn read(path: &Utf8Path, delimiter: u8) -> Result<Self, EnaError> {
        let file = File::open(path.as_std_path())
            .map_err(|err| EnaError::Filesystem(format!("open {path}: {err}")))?;
        Self::from_reader(BufReader::new(file), delimiter)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, EnaError> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        let width = columns.len();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.len() > width {
                warn!(
                    line = record.position().map(|pos| pos.line()).unwrap_or(0),
                    cells = record.len(),
                    columns = width,
                    "row has more cells than the header, extra cells dropped"
                );
            }
            let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn to_bytes(&self, delimiter: u8) -> Result<Vec<u8>, EnaError> {
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        if !self.columns.is_empty() {
            writer.write_record(&self.columns)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
        }
        writer
            .into_inner()
            .map_err(|err| EnaError::Table(err.to_string()))
    }

    pub fn write(&self, path: &Utf8Path, delimiter: u8) -> Result<(), EnaError> {
        let bytes = self.to_bytes(delimiter)?;
        Store::write_bytes_atomic(path, &bytes)
    }

    /// Index of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str, table: &str) -> Result<usize, EnaError> {
        self.column_index(name).ok_or_else(|| EnaError::MissingColumn {
            column: name.to_string(),
            table: table.to_string(),
        })
    }

    /// Column names that occur more than once, each reported once.
    pub fn duplicate_columns(&self) -> Vec<String> {
        let mut duplicates: Vec<String> = Vec::new();
        for (idx, name) in self.columns.iter().enumerate() {
            if self.columns[..idx].contains(name) && !duplicates.contains(name) {
                duplicates.push(name.clone());
            }
        }
        duplicates
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
