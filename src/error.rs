use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnaError {
    #[error("invalid mode: {0} (expected get_gvcf or merge_gvcf)")]
    #[diagnostic(help("run `ena-tables get_gvcf` or `ena-tables merge_gvcf`"))]
    InvalidMode(String),

    #[error("invalid ENA accession: {0:?}")]
    InvalidAccession(String),

    #[error("missing config file config/config.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no ENA accessions configured for mode {0}")]
    EmptyAccessionList(String),

    #[error("ENA request failed: {0}")]
    EnaHttp(String),

    #[error("ENA returned status {status}: {message}")]
    EnaStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("required column {column} missing from {table}")]
    MissingColumn { column: String, table: String },

    #[error("strain id cannot be used as a file name: {0:?}")]
    InvalidStrainId(String),
}

impl From<csv::Error> for EnaError {
    fn from(err: csv::Error) -> Self {
        EnaError::Table(err.to_string())
    }
}
