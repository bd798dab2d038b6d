use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{Accession, Mode};
use crate::error::EnaError;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";
pub const DEFAULT_RESULTS_ROOT: &str = "results";

/// Workflow config shared with the rest of the pipeline; keys this tool does
/// not know about are ignored.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(rename = "ENA_ID_get_gvcf", default)]
    pub ena_id_get_gvcf: Vec<String>,
    #[serde(rename = "ENA_ID_merge_gvcf", default)]
    pub ena_id_merge_gvcf: Vec<String>,
    pub tax_id: u64,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub mode: Mode,
    pub accessions: Vec<Accession>,
    pub tax_id: u64,
    pub results_dir: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        mode: Mode,
        results_root: &Utf8Path,
    ) -> Result<ResolvedConfig, EnaError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_PATH),
        };

        if path.is_none() && !config_path.exists() {
            return Err(EnaError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| EnaError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| EnaError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, mode, results_root)
    }

    pub fn resolve_config(
        config: Config,
        mode: Mode,
        results_root: &Utf8Path,
    ) -> Result<ResolvedConfig, EnaError> {
        let raw = match mode {
            Mode::GetGvcf => config.ena_id_get_gvcf,
            Mode::MergeGvcf => config.ena_id_merge_gvcf,
        };

        let mut seen = HashSet::new();
        let mut accessions = Vec::new();
        for value in raw {
            let accession: Accession = value.parse()?;
            if seen.insert(accession.clone()) {
                accessions.push(accession);
            }
        }
        if accessions.is_empty() {
            return Err(EnaError::EmptyAccessionList(mode.to_string()));
        }

        Ok(ResolvedConfig {
            mode,
            accessions,
            tax_id: config.tax_id,
            results_dir: results_root.join(mode.results_dir_name()),
        })
    }
}
