use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::Accession;
use crate::error::EnaError;

pub const MERGED_TABLE: &str = "merged_table.tsv.ok";
pub const FILTERED_TABLE: &str = "merged_filtered_table.csv";
pub const STRAIN_LIST: &str = "ENA_strain_list.json";

/// File layout of one mode's results directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn raw_record_path(&self, accession: &Accession) -> Utf8PathBuf {
        self.root.join(format!("{}.tsv", accession.as_str()))
    }

    pub fn merged_table_path(&self) -> Utf8PathBuf {
        self.root.join(MERGED_TABLE)
    }

    pub fn filtered_table_path(&self) -> Utf8PathBuf {
        self.root.join(FILTERED_TABLE)
    }

    pub fn strain_table_path(&self, strain_id: &str) -> Utf8PathBuf {
        self.root.join(format!("{strain_id}.csv"))
    }

    pub fn strain_list_path(&self) -> Utf8PathBuf {
        self.root.join(STRAIN_LIST)
    }

    pub fn ensure_root(&self) -> Result<(), EnaError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| EnaError::Filesystem(err.to_string()))
    }

    /// Creates the directory, or removes the regular files left in it by a
    /// previous run. Sub-directories are kept.
    pub fn prepare(&self) -> Result<usize, EnaError> {
        if !self.root.as_std_path().exists() {
            self.ensure_root()?;
            return Ok(0);
        }
        let mut removed = 0usize;
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| EnaError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| EnaError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|err| {
                    EnaError::Filesystem(format!("remove {}: {err}", path.display()))
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn write_strain_list(&self, strain_ids: &[String]) -> Result<Utf8PathBuf, EnaError> {
        let path = self.strain_list_path();
        let content = serde_json::to_vec(strain_ids)
            .map_err(|err| EnaError::Serialize(format!("strain list: {err}")))?;
        Self::write_bytes_atomic(&path, &content)?;
        Ok(path)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), EnaError> {
        let parent = parent_dir(path);
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| EnaError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("ena-tables")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| EnaError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| EnaError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| EnaError::Filesystem(format!("persist {path}: {err}")))?;
        Ok(())
    }

    pub fn remove_file(path: &Utf8Path) -> Result<(), EnaError> {
        fs::remove_file(path.as_std_path())
            .map_err(|err| EnaError::Filesystem(format!("remove {path}: {err}")))
    }
}

fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}
