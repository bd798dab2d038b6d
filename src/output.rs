use std::io::{self, Write};

use serde::Serialize;

use crate::app::{PipelineResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_result(result: &PipelineResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable progress on stderr and a summary on stdout.
pub struct TextOutput;

impl TextOutput {
    pub fn print_result(result: &PipelineResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "ENA tables ({})", result.mode)?;
        writeln!(stdout, "  results: {}", result.results_dir)?;
        writeln!(stdout, "  downloaded reports: {}", result.fetched.len())?;
        for failure in &result.failed {
            match failure.status {
                Some(status) => {
                    writeln!(stdout, "  failed: {} (status {status})", failure.accession)?
                }
                None => writeln!(stdout, "  failed: {} ({})", failure.accession, failure.reason)?,
            }
        }
        if let Some(rows) = result.merged_rows {
            writeln!(stdout, "  merged runs: {rows}")?;
        }
        if !result.duplicate_columns.is_empty() {
            writeln!(
                stdout,
                "  duplicate columns: {}",
                result.duplicate_columns.join(", ")
            )?;
        }
        if let Some(rows) = result.normalized_rows {
            writeln!(stdout, "  kept runs: {rows}")?;
        }
        writeln!(stdout, "  strains: {}", result.strains.len())?;
        for rejected in &result.rejected_strains {
            writeln!(
                stdout,
                "  skipped strain: {} ({} runs): {}",
                rejected.strain_id, rejected.rows, rejected.reason
            )?;
        }
        if let Some(path) = &result.strain_list {
            writeln!(stdout, "  strain list: {path}")?;
        }
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }
}
