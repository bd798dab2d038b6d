use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Accession;
use crate::error::EnaError;

pub const FILEREPORT_URL: &str = "https://www.ebi.ac.uk/ena/portal/api/filereport";

/// Columns requested for every read_run report.
pub const FILEREPORT_FIELDS: &[&str] = &[
    "study_accession",
    "run_accession",
    "tax_id",
    "scientific_name",
    "instrument_platform",
    "study_title",
    "fastq_md5",
    "fastq_ftp",
    "sample_alias",
    "sample_title",
];

pub trait EnaClient {
    /// Raw tab-separated read_run report for one accession.
    fn filereport(&self, accession: &Accession) -> Result<Vec<u8>, EnaError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    base_url: String,
}

impl EnaHttpClient {
    pub fn new() -> Result<Self, EnaError> {
        Self::with_base_url(FILEREPORT_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, EnaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ena-tables/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EnaError::EnaHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| EnaError::EnaHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

impl EnaClient for EnaHttpClient {
    fn filereport(&self, accession: &Accession) -> Result<Vec<u8>, EnaError> {
        let fields = FILEREPORT_FIELDS.join(",");
        let response = self
            .client
            .get(&self.base_url)
            .query(&filereport_query(accession, &fields))
            .send()
            .map_err(|err| EnaError::EnaHttp(err.to_string()))?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENA request failed".to_string());
            return Err(EnaError::EnaStatus {
                status,
                message: message.trim().to_string(),
            });
        }
        let bytes = response
            .bytes()
            .map_err(|err| EnaError::EnaHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

pub fn filereport_query<'a>(
    accession: &'a Accession,
    fields: &'a str,
) -> [(&'static str, &'a str); 6] {
    [
        ("accession", accession.as_str()),
        ("result", "read_run"),
        ("fields", fields),
        ("format", "tsv"),
        ("download", "true"),
        ("limit", "0"),
    ]
}
