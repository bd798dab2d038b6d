use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::domain::Mode;
use crate::ena::EnaClient;
use crate::error::EnaError;
use crate::fetch::{FetchFailure, fetch_records};
use crate::merge::merge_tables;
use crate::normalize::normalize_table;
use crate::partition::{RejectedStrain, partition_table};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub mode: Mode,
    pub results_dir: String,
    pub fetched: Vec<String>,
    pub failed: Vec<FetchFailure>,
    pub merged_rows: Option<usize>,
    pub duplicate_columns: Vec<String>,
    pub normalized_rows: Option<usize>,
    pub strains: Vec<String>,
    pub rejected_strains: Vec<RejectedStrain>,
    pub strain_list: Option<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<E: EnaClient> {
    store: Store,
    ena: E,
}

impl<E: EnaClient> App<E> {
    pub fn new(store: Store, ena: E) -> Self {
        Self { store, ena }
    }

    /// Runs fetch, merge, normalize and partition for one mode.
    ///
    /// A stage that finds nothing to work on ends the run early with an empty
    /// result instead of an error.
    pub fn run(
        &self,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<PipelineResult, EnaError> {
        let start = Instant::now();
        let mut result = PipelineResult {
            mode: config.mode,
            results_dir: self.store.root().to_string(),
            fetched: Vec::new(),
            failed: Vec::new(),
            merged_rows: None,
            duplicate_columns: Vec::new(),
            normalized_rows: None,
            strains: Vec::new(),
            rejected_strains: Vec::new(),
            strain_list: None,
            generated_at: now_rfc3339(),
        };

        sink.event(ProgressEvent {
            message: format!("phase=Prepare; results dir {}", self.store.root()),
            elapsed: None,
        });
        let removed = self.store.prepare()?;
        if removed > 0 {
            info!(removed, dir = %self.store.root(), "removed files from previous run");
        }

        let fetch = fetch_records(&self.ena, &config.accessions, &self.store, sink)?;
        result.fetched = fetch.saved.into_iter().map(|saved| saved.accession).collect();
        result.failed = fetch.failures;
        if result.fetched.is_empty() {
            warn!(mode = %config.mode, "no ENA reports were downloaded");
        }

        sink.event(ProgressEvent {
            message: "phase=Merge; concatenating reports".to_string(),
            elapsed: Some(start.elapsed()),
        });
        let merged_path = self.store.merged_table_path();
        let Some(merge) = merge_tables(self.store.root(), &merged_path)? else {
            return Ok(result);
        };
        result.merged_rows = Some(merge.rows);
        result.duplicate_columns = merge.duplicate_columns;

        sink.event(ProgressEvent {
            message: "phase=Normalize; filtering runs".to_string(),
            elapsed: Some(start.elapsed()),
        });
        let filtered_path = self.store.filtered_table_path();
        let Some(normalized) = normalize_table(&merged_path, &filtered_path, config.tax_id)?
        else {
            return Ok(result);
        };
        result.normalized_rows = Some(normalized.report.rows);

        sink.event(ProgressEvent {
            message: "phase=Partition; writing strain tables".to_string(),
            elapsed: Some(start.elapsed()),
        });
        let Some(partition) = partition_table(&filtered_path, &self.store)? else {
            return Ok(result);
        };
        let list_path = self.store.write_strain_list(&partition.strains)?;
        result.strains = partition.strains;
        result.rejected_strains = partition.rejected;
        result.strain_list = Some(list_path.to_string());

        sink.event(ProgressEvent {
            message: format!("phase=Done; {} strains", result.strains.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(result)
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
