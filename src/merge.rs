use std::collections::HashMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::EnaError;
use crate::store::Store;
use crate::table::{TSV, Table};

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub sources: Vec<String>,
    pub columns: Vec<String>,
    pub rows: usize,
    pub duplicate_columns: Vec<String>,
    pub output: String,
}

/// Concatenates every `*.tsv` file in `dir` into one tab-separated table at
/// `output`, deleting each source once its rows are taken.
///
/// Sources are visited in file-name order. Returns `Ok(None)` when the
/// directory is missing or holds no TSV files.
pub fn merge_tables(dir: &Utf8Path, output: &Utf8Path) -> Result<Option<MergeReport>, EnaError> {
    let sources = match list_tsv_files(dir) {
        Ok(sources) => sources,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(dir = %dir, "the specified directory does not exist");
            return Ok(None);
        }
        Err(err) => return Err(EnaError::Filesystem(format!("read {dir}: {err}"))),
    };
    if sources.is_empty() {
        warn!(dir = %dir, "no TSV files found in the specified directory");
        return Ok(None);
    }

    let mut merged = Table::default();
    for source in &sources {
        let table = Table::read(source, TSV)?;
        append(&mut merged, table);
        if let Err(err) = Store::remove_file(source) {
            warn!(error = %err, "could not delete merged source file");
        }
    }
    let width = merged.columns.len();
    for row in &mut merged.rows {
        row.resize(width, String::new());
    }

    let duplicate_columns = merged.duplicate_columns();
    if !duplicate_columns.is_empty() {
        warn!(
            columns = %duplicate_columns.join(", "),
            "duplicate column names found"
        );
    }

    merged.write(output, TSV)?;
    info!(
        sources = sources.len(),
        rows = merged.len(),
        output = %output,
        "merged read_run reports"
    );

    Ok(Some(MergeReport {
        sources: sources.iter().map(|path| path.to_string()).collect(),
        columns: merged.columns.clone(),
        rows: merged.len(),
        duplicate_columns,
        output: output.to_string(),
    }))
}

/// Appends `source` to `merged`, growing the schema as needed.
///
/// The n-th column called `x` in a source lands in the n-th `x` column of the
/// merged schema, so a name shared across sources maps to one column while a
/// name repeated inside one source keeps all of its copies.
fn append(merged: &mut Table, source: Table) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut slots = Vec::with_capacity(source.columns.len());
    for name in &source.columns {
        let occurrence = seen.entry(name.as_str()).or_insert(0);
        let slot = merged
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| *column == name)
            .map(|(idx, _)| idx)
            .nth(*occurrence);
        *occurrence += 1;
        let slot = match slot {
            Some(slot) => slot,
            None => {
                merged.columns.push(name.clone());
                merged.columns.len() - 1
            }
        };
        slots.push(slot);
    }

    for row in source.rows {
        let mut cells = vec![String::new(); merged.columns.len()];
        for (value, slot) in row.into_iter().zip(&slots) {
            cells[*slot] = value;
        }
        merged.rows.push(cells);
    }
}

fn list_tsv_files(dir: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir.as_std_path())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            continue;
        };
        if path.extension() == Some("tsv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            columns: columns.iter().map(|name| name.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn append_unions_schema() {
        let mut merged = Table::default();
        append(&mut merged, table(&["A", "B"], &[&["a1", "b1"]]));
        append(&mut merged, table(&["B", "C"], &[&["b2", "c2"]]));

        assert_eq!(merged.columns, vec!["A", "B", "C"]);
        assert_eq!(merged.rows[0], vec!["a1", "b1"]);
        assert_eq!(merged.rows[1], vec!["", "b2", "c2"]);
        assert!(merged.duplicate_columns().is_empty());
    }

    #[test]
    fn append_keeps_repeated_columns() {
        let mut merged = Table::default();
        append(&mut merged, table(&["A", "B", "B"], &[&["a", "b1", "b2"]]));
        append(&mut merged, table(&["B"], &[&["b3"]]));

        assert_eq!(merged.columns, vec!["A", "B", "B"]);
        assert_eq!(merged.rows[1], vec!["", "b3", ""]);
        assert_eq!(merged.duplicate_columns(), vec!["B"]);
    }
}
