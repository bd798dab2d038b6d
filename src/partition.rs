use std::collections::HashMap;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::EnaError;
use crate::normalize::STRAIN_ID_COLUMN;
use crate::store::Store;
use crate::table::{CSV, Table};

/// Rows of one strain, in table order.
#[derive(Debug, Clone)]
pub struct StrainGroup {
    pub strain_id: String,
    pub table: Table,
}

/// Splits `table` by `ENA_strain_id`. Groups come out in order of first
/// appearance.
pub fn group_by_strain(table: &Table) -> Result<Vec<StrainGroup>, EnaError> {
    let key = table.require_column(STRAIN_ID_COLUMN, "filtered read_run table")?;

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<StrainGroup> = Vec::new();
    for row in &table.rows {
        let strain_id = row[key].as_str();
        let slot = *index.entry(strain_id).or_insert_with(|| {
            groups.push(StrainGroup {
                strain_id: strain_id.to_string(),
                table: Table::new(table.columns.clone()),
            });
            groups.len() - 1
        });
        groups[slot].table.rows.push(row.clone());
    }
    Ok(groups)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionReport {
    pub strains: Vec<String>,
    pub rejected: Vec<RejectedStrain>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedStrain {
    pub strain_id: String,
    pub rows: usize,
    pub reason: String,
}

/// Writes one `<strain id>.csv` per strain into the store root. Returns
/// `Ok(None)` if `input` does not exist.
///
/// A strain whose id is not a usable file name, or whose table cannot be
/// written, is recorded in `rejected` and left out of `strains`; the other
/// strains are still written.
pub fn partition_table(
    input: &Utf8Path,
    store: &Store,
) -> Result<Option<PartitionReport>, EnaError> {
    if !input.as_std_path().is_file() {
        warn!(input = %input, "input file not found");
        return Ok(None);
    }
    let table = Table::read(input, CSV)?;
    store.ensure_root()?;

    let groups = group_by_strain(&table)?;
    let mut report = PartitionReport::default();
    for group in groups {
        let written = validate_file_stem(&group.strain_id)
            .and_then(|()| group.table.write(&store.strain_table_path(&group.strain_id), CSV));
        match written {
            Ok(()) => report.strains.push(group.strain_id),
            Err(err) => {
                warn!(
                    strain = %group.strain_id,
                    rows = group.table.len(),
                    error = %err,
                    "skipping strain table"
                );
                report.rejected.push(RejectedStrain {
                    rows: group.table.len(),
                    reason: err.to_string(),
                    strain_id: group.strain_id,
                });
            }
        }
    }
    info!(
        strains = report.strains.len(),
        rejected = report.rejected.len(),
        dir = %store.root(),
        "wrote per-strain tables"
    );
    Ok(Some(report))
}

fn validate_file_stem(strain_id: &str) -> Result<(), EnaError> {
    let is_valid = !strain_id.is_empty()
        && strain_id != "."
        && strain_id != ".."
        && !strain_id.contains(['/', '\\', '\0']);
    if !is_valid {
        return Err(EnaError::InvalidStrainId(strain_id.to_string()));
    }
    Ok(())
}
