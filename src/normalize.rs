use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::Layout;
use crate::error::EnaError;
use crate::store::Store;
use crate::table::{CSV, TSV, Table};

pub const STRAIN_ID_COLUMN: &str = "ENA_strain_id";
pub const END_COLUMN: &str = "end";

const STUDY_ACCESSION: &str = "study_accession";
const TAX_ID: &str = "tax_id";
const FASTQ_FTP: &str = "fastq_ftp";
const FASTQ_MD5: &str = "fastq_md5";
const SAMPLE_ALIAS: &str = "sample_alias";
const SAMPLE_TITLE: &str = "sample_title";

const PAIRED_SUFFIXES: [&str; 2] = ["_1.fastq.gz", "_2.fastq.gz"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    pub input_rows: usize,
    pub rows: usize,
    pub dropped_no_read_files: usize,
    pub dropped_no_sample_label: usize,
    pub dropped_other_taxon: usize,
    pub repaired_layouts: usize,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: Table,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoReadFiles,
    NoSampleLabel,
    OtherTaxon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub cells: Vec<String>,
    pub repaired: bool,
}

/// Positions of the columns normalization reads.
#[derive(Debug, Clone, Copy)]
pub struct RunColumns {
    study_accession: usize,
    tax_id: usize,
    fastq_ftp: usize,
    fastq_md5: Option<usize>,
    sample_alias: Option<usize>,
    sample_title: Option<usize>,
}

impl RunColumns {
    pub fn locate(table: &Table) -> Result<Self, EnaError> {
        let name = "merged read_run table";
        Ok(Self {
            study_accession: table.require_column(STUDY_ACCESSION, name)?,
            tax_id: table.require_column(TAX_ID, name)?,
            fastq_ftp: table.require_column(FASTQ_FTP, name)?,
            fastq_md5: table.column_index(FASTQ_MD5),
            sample_alias: table.column_index(SAMPLE_ALIAS),
            sample_title: table.column_index(SAMPLE_TITLE),
        })
    }
}

/// Reads the merged TSV at `input`, writes the filtered CSV to `output` and
/// deletes `input`. Returns `Ok(None)` if `input` does not exist.
pub fn normalize_table(
    input: &Utf8Path,
    output: &Utf8Path,
    tax_id: u64,
) -> Result<Option<Normalized>, EnaError> {
    if !input.as_std_path().is_file() {
        warn!(input = %input, "input file not found");
        return Ok(None);
    }
    let merged = Table::read(input, TSV)?;
    if merged.columns.is_empty() {
        warn!(input = %input, "merged table is empty, nothing to normalize");
        Store::remove_file(input)?;
        return Ok(None);
    }

    let normalized = normalize(&merged, tax_id)?;
    normalized.table.write(output, CSV)?;
    Store::remove_file(input)?;

    let report = NormalizeReport {
        output: output.to_string(),
        ..normalized.report
    };
    info!(
        kept = report.rows,
        of = report.input_rows,
        repaired = report.repaired_layouts,
        output = %output,
        "filtered read_run table"
    );
    Ok(Some(Normalized {
        table: normalized.table,
        report,
    }))
}

/// Filters and rewrites every row of `table`. The result has
/// `ENA_strain_id` first, the source columns, then `end`.
pub fn normalize(table: &Table, tax_id: u64) -> Result<Normalized, EnaError> {
    let columns = RunColumns::locate(table)?;

    let mut header = Vec::with_capacity(table.columns.len() + 2);
    header.push(STRAIN_ID_COLUMN.to_string());
    header.extend(table.columns.iter().cloned());
    header.push(END_COLUMN.to_string());
    let mut out = Table::new(header);

    let mut report = NormalizeReport {
        input_rows: table.len(),
        ..NormalizeReport::default()
    };
    for row in &table.rows {
        match normalize_row(row, &columns, tax_id) {
            Ok(normalized) => {
                if normalized.repaired {
                    report.repaired_layouts += 1;
                }
                out.rows.push(normalized.cells);
            }
            Err(Rejection::NoReadFiles) => report.dropped_no_read_files += 1,
            Err(Rejection::NoSampleLabel) => report.dropped_no_sample_label += 1,
            Err(Rejection::OtherTaxon) => report.dropped_other_taxon += 1,
        }
    }
    report.rows = out.len();

    Ok(Normalized { table: out, report })
}

/// Applies the filters, sanitization, layout classification and strain id
/// derivation to a single row. Returned cells follow the normalized header.
pub fn normalize_row(
    row: &[String],
    columns: &RunColumns,
    tax_id: u64,
) -> Result<NormalizedRow, Rejection> {
    let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");
    let optional = |idx: Option<usize>| idx.map(cell).filter(|value| is_present(value));

    if !is_present(cell(columns.fastq_ftp)) {
        return Err(Rejection::NoReadFiles);
    }
    if optional(columns.sample_alias).is_none() && optional(columns.sample_title).is_none() {
        return Err(Rejection::NoSampleLabel);
    }
    if !tax_id_matches(cell(columns.tax_id), tax_id) {
        return Err(Rejection::OtherTaxon);
    }

    let mut cells: Vec<String> = row.iter().map(|value| sanitize(value)).collect();

    let file_count = cells[columns.fastq_ftp].split(';').count();
    let mut repaired = false;
    let layout = match Layout::from_file_count(file_count) {
        Some(layout) => layout,
        None => {
            let md5 = columns.fastq_md5.map(|idx| cells[idx].as_str()).unwrap_or("");
            let (ftp, md5, kept) = keep_paired_files(&cells[columns.fastq_ftp], md5);
            if kept != 2 {
                warn!(
                    study = %cells[columns.study_accession],
                    files = file_count,
                    kept,
                    "layout repair left an unexpected number of read files, labelling PAIRED"
                );
            }
            cells[columns.fastq_ftp] = ftp;
            if let Some(idx) = columns.fastq_md5 {
                cells[idx] = md5;
            }
            repaired = true;
            Layout::Paired
        }
    };

    let label = columns
        .sample_alias
        .map(|idx| cells[idx].as_str())
        .filter(|value| is_present(value))
        .or_else(|| {
            columns
                .sample_title
                .map(|idx| cells[idx].as_str())
                .filter(|value| is_present(value))
        })
        .unwrap_or("");
    let strain_id = strain_id(&cells[columns.study_accession], label);

    let mut out = Vec::with_capacity(cells.len() + 2);
    out.push(strain_id);
    out.extend(cells);
    out.push(layout.to_string());
    Ok(NormalizedRow {
        cells: out,
        repaired,
    })
}

/// Replaces the characters that break downstream CSV and file-name handling.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            ',' => '-',
            ' ' | ':' => '_',
            other => other,
        })
        .collect()
}

/// `<study>_<label>`, with underscores inside the label turned into hyphens so
/// the id holds a single `_` separator after the study accession.
pub fn strain_id(study_accession: &str, label: &str) -> String {
    format!("{study_accession}_{}", label.replace('_', "-"))
}

/// Keeps the `_1`/`_2` read files of a run that lists extra files, together
/// with their checksums. Returns the rebuilt fields and the number of files
/// kept.
pub fn keep_paired_files(fastq_ftp: &str, fastq_md5: &str) -> (String, String, usize) {
    let checksums: Vec<&str> = fastq_md5.split(';').collect();
    let mut files = Vec::new();
    let mut sums = Vec::new();
    for (idx, file) in fastq_ftp.split(';').enumerate() {
        if PAIRED_SUFFIXES.iter().any(|suffix| file.ends_with(suffix)) {
            files.push(file);
            if let Some(sum) = checksums.get(idx) {
                sums.push(*sum);
            }
        }
    }
    let kept = files.len();
    (files.join(";"), sums.join(";"), kept)
}

/// Only an empty cell counts as missing; whitespace is a value.
fn is_present(value: &str) -> bool {
    !value.is_empty()
}

fn tax_id_matches(value: &str, tax_id: u64) -> bool {
    let value = value.trim();
    if let Ok(parsed) = value.parse::<u64>() {
        return parsed == tax_id;
    }
    // Integer columns with gaps can come back as floats ("4932.0").
    value
        .parse::<f64>()
        .map(|parsed| parsed.fract() == 0.0 && parsed == tax_id as f64)
        .unwrap_or(false)
}
