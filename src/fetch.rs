use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::Accession;
use crate::ena::EnaClient;
use crate::error::EnaError;
use crate::store::Store;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub saved: Vec<SavedRecord>,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedRecord {
    pub accession: String,
    pub path: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub accession: String,
    pub status: Option<u16>,
    pub reason: String,
}

/// Downloads one read_run report per accession into `<root>/<accession>.tsv`.
///
/// A failed request or write is recorded in the report and the loop moves on
/// to the next accession. Only failing to create the directory is an error.
pub fn fetch_records<C: EnaClient + ?Sized>(
    client: &C,
    accessions: &[Accession],
    store: &Store,
    sink: &dyn ProgressSink,
) -> Result<FetchReport, EnaError> {
    store.ensure_root()?;

    let mut report = FetchReport::default();
    for accession in accessions {
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; ena.request {accession}"),
            elapsed: None,
        });
        let start = Instant::now();
        let body = match client.filereport(accession) {
            Ok(body) => body,
            Err(err) => {
                let status = match &err {
                    EnaError::EnaStatus { status, .. } => Some(*status),
                    _ => None,
                };
                match status {
                    Some(code) => warn!(
                        accession = %accession,
                        status = code,
                        "failed to download TSV for ENA accession"
                    ),
                    None => warn!(
                        accession = %accession,
                        error = %err,
                        "failed to download TSV for ENA accession"
                    ),
                }
                report.failures.push(FetchFailure {
                    accession: accession.to_string(),
                    status,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        sink.event(ProgressEvent {
            message: format!("ena.response {accession} bytes={}", body.len()),
            elapsed: Some(start.elapsed()),
        });

        let path = store.raw_record_path(accession);
        if let Err(err) = Store::write_bytes_atomic(&path, &body) {
            warn!(accession = %accession, error = %err, "error saving TSV for ENA accession");
            report.failures.push(FetchFailure {
                accession: accession.to_string(),
                status: None,
                reason: err.to_string(),
            });
            continue;
        }
        info!(accession = %accession, path = %path, "saved read_run report");
        report.saved.push(SavedRecord {
            accession: accession.to_string(),
            path: path.to_string(),
            bytes: body.len(),
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use camino::Utf8PathBuf;

    use super::*;

    struct Quiet;

    impl ProgressSink for Quiet {
        fn event(&self, _event: ProgressEvent) {}
    }

    struct FlakyEna {
        calls: RefCell<Vec<String>>,
    }

    impl EnaClient for FlakyEna {
        fn filereport(&self, accession: &Accession) -> Result<Vec<u8>, EnaError> {
            self.calls.borrow_mut().push(accession.to_string());
            match accession.as_str() {
                "BAD" => Err(EnaError::EnaStatus {
                    status: 500,
                    message: "boom".to_string(),
                }),
                "OFFLINE" => Err(EnaError::EnaHttp("connection refused".to_string())),
                _ => Ok(b"study_accession\tfastq_ftp\n".to_vec()),
            }
        }
    }

    #[test]
    fn continues_after_failed_accession() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("nested/tables")).unwrap();
        let store = Store::new(root.clone());
        let accessions: Vec<Accession> = ["BAD", "GOOD"]
            .iter()
            .map(|value| value.parse().unwrap())
            .collect();
        let client = FlakyEna {
            calls: RefCell::new(Vec::new()),
        };

        let report = fetch_records(&client, &accessions, &store, &Quiet).unwrap();

        assert_eq!(*client.calls.borrow(), vec!["BAD", "GOOD"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].status, Some(500));
        assert_eq!(report.saved.len(), 1);
        assert!(root.join("GOOD.tsv").as_std_path().exists());
        assert!(!root.join("BAD.tsv").as_std_path().exists());
    }

    fn flaky() -> FlakyEna {
        FlakyEna {
            calls: RefCell::new(Vec::new()),
        }
    }

    fn accessions(values: &[&str]) -> Vec<Accession> {
        values.iter().map(|value| value.parse().unwrap()).collect()
    }

    #[test]
    fn continues_after_transport_error() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let store = Store::new(root.clone());

        let report =
            fetch_records(&flaky(), &accessions(&["OFFLINE", "B"]), &store, &Quiet).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].accession, "OFFLINE");
        assert_eq!(report.failures[0].status, None);
        assert!(report.failures[0].reason.contains("connection refused"));
        assert_eq!(report.saved.len(), 1);
        assert!(root.join("B.tsv").as_std_path().is_file());
    }

    #[test]
    fn continues_after_failed_write() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("A.tsv").as_std_path()).unwrap();
        std::fs::write(root.join("A.tsv/blocker").as_std_path(), b"x").unwrap();
        let store = Store::new(root.clone());

        let report = fetch_records(&flaky(), &accessions(&["A", "B"]), &store, &Quiet).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].accession, "A");
        assert_eq!(report.failures[0].status, None);
        assert_eq!(report.saved.len(), 1);
        assert_eq!(report.saved[0].accession, "B");
        assert!(root.join("B.tsv").as_std_path().is_file());
        assert!(root.join("A.tsv").as_std_path().is_dir());
    }
}
