use std::collections::HashMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use ena_tables::app::{App, ProgressEvent, ProgressSink};
use ena_tables::config::ResolvedConfig;
use ena_tables::domain::{Accession, Mode};
use ena_tables::ena::EnaClient;
use ena_tables::error::EnaError;
use ena_tables::store::Store;
use ena_tables::table::{CSV, Table};

const HEADER: &str = "study_accession\trun_accession\ttax_id\tscientific_name\tinstrument_platform\tstudy_title\tfastq_md5\tfastq_ftp\tsample_alias\tsample_title\n";

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
struct MockEna {
    reports: HashMap<String, String>,
}

impl MockEna {
    fn with(mut self, accession: &str, rows: &[&str]) -> Self {
        let mut body = HEADER.to_string();
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        self.reports.insert(accession.to_string(), body);
        self
    }
}

impl EnaClient for MockEna {
    fn filereport(&self, accession: &Accession) -> Result<Vec<u8>, EnaError> {
        match self.reports.get(accession.as_str()) {
            Some(body) => Ok(body.as_bytes().to_vec()),
            None => Err(EnaError::EnaStatus {
                status: 404,
                message: "not found".to_string(),
            }),
        }
    }
}

fn resolved(root: &Utf8Path, accessions: &[&str]) -> ResolvedConfig {
    ResolvedConfig {
        mode: Mode::GetGvcf,
        accessions: accessions.iter().map(|acc| acc.parse().unwrap()).collect(),
        tax_id: 4932,
        results_dir: root.join(Mode::GetGvcf.results_dir_name()),
    }
}

fn file_names(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn single_paired_run_ends_up_in_its_own_table() {
    let (_temp, root) = temp_root();
    let config = resolved(&root, &["X"]);
    let ena = MockEna::default().with(
        "X",
        &["X\tERR1\t4932\tSaccharomyces cerevisiae\tILLUMINA\tYeast: 1,011 genomes\tm1;m2\tf_1.fastq.gz;f_2.fastq.gz\ts_a\t"],
    );
    let app = App::new(Store::new(config.results_dir.clone()), ena);

    let result = app.run(&config, &NoopSink).unwrap();

    assert_eq!(result.fetched, vec!["X"]);
    assert!(result.failed.is_empty());
    assert_eq!(result.merged_rows, Some(1));
    assert_eq!(result.normalized_rows, Some(1));
    assert_eq!(result.strains, vec!["X_s-a"]);

    let dir = &config.results_dir;
    assert_eq!(
        file_names(dir),
        vec!["ENA_strain_list.json", "X_s-a.csv", "merged_filtered_table.csv"]
    );

    let strain = Table::read(&dir.join("X_s-a.csv"), CSV).unwrap();
    assert_eq!(strain.columns[0], "ENA_strain_id");
    assert_eq!(strain.rows.len(), 1);
    let row = &strain.rows[0];
    let col = |name: &str| &row[strain.column_index(name).unwrap()];
    assert_eq!(col("ENA_strain_id"), "X_s-a");
    assert_eq!(col("end"), "PAIRED");
    assert_eq!(col("fastq_ftp"), "f_1.fastq.gz;f_2.fastq.gz");
    assert_eq!(col("fastq_md5"), "m1;m2");
    assert_eq!(col("study_title"), "Yeast__1-011_genomes");
    for cell in row {
        assert!(!cell.contains([',', ' ', ':']), "unsanitized cell {cell:?}");
    }

    let list: Vec<String> =
        serde_json::from_str(&fs::read_to_string(dir.join("ENA_strain_list.json")).unwrap())
            .unwrap();
    assert_eq!(list, vec!["X_s-a"]);
}

#[test]
fn failed_downloads_leave_no_output() {
    let (_temp, root) = temp_root();
    let config = resolved(&root, &["A", "B"]);
    let app = App::new(Store::new(config.results_dir.clone()), MockEna::default());

    let result = app.run(&config, &NoopSink).unwrap();

    assert!(result.fetched.is_empty());
    assert_eq!(result.failed.len(), 2);
    assert_eq!(result.failed[0].status, Some(404));
    assert_eq!(result.merged_rows, None);
    assert_eq!(result.normalized_rows, None);
    assert!(result.strains.is_empty());
    assert!(result.strain_list.is_none());
    assert!(config.results_dir.as_std_path().is_dir());
    assert!(file_names(&config.results_dir).is_empty());
}

#[test]
fn partitions_cover_every_kept_run() {
    let (_temp, root) = temp_root();
    let config = resolved(&root, &["PRJEB1", "PRJEB2", "PRJEB3"]);
    let ena = MockEna::default()
        .with(
            "PRJEB1",
            &[
                "PRJEB1\tERR1\t4932\tS\tILLUMINA\tT\tm1\tr1.fastq.gz\tAAA\t",
                "PRJEB1\tERR2\t4932\tS\tILLUMINA\tT\tm1;m2\tr2_1.fastq.gz;r2_2.fastq.gz\tAAA\t",
                "PRJEB1\tERR3\t9606\tH\tILLUMINA\tT\tm1\tr3.fastq.gz\tBBB\t",
            ],
        )
        .with(
            "PRJEB2",
            &[
                "PRJEB2\tERR4\t4932\tS\tILLUMINA\tT\tm0;m1;m2\tr4.fastq.gz;r4_1.fastq.gz;r4_2.fastq.gz\t\tstrain one",
                "PRJEB2\tERR5\t4932\tS\tILLUMINA\tT\t\t\tCCC\t",
                "PRJEB2\tERR6\t4932\tS\tILLUMINA\tT\tm1\tr6.fastq.gz\t\t",
            ],
        );
    let app = App::new(Store::new(config.results_dir.clone()), ena);

    let result = app.run(&config, &NoopSink).unwrap();

    assert_eq!(result.fetched, vec!["PRJEB1", "PRJEB2"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.merged_rows, Some(6));
    assert_eq!(result.normalized_rows, Some(3));
    assert_eq!(result.strains, vec!["PRJEB1_AAA", "PRJEB2_strain-one"]);

    let dir = &config.results_dir;
    let filtered = Table::read(&dir.join("merged_filtered_table.csv"), CSV).unwrap();
    let mut from_groups = Vec::new();
    for strain in &result.strains {
        let group = Table::read(&dir.join(format!("{strain}.csv")), CSV).unwrap();
        assert_eq!(group.columns, filtered.columns);
        assert!(group.rows.iter().all(|row| &row[0] == strain));
        from_groups.extend(group.rows);
    }
    let mut expected = filtered.rows.clone();
    expected.sort();
    from_groups.sort();
    assert_eq!(from_groups, expected);

    let repaired = Table::read(&dir.join("PRJEB2_strain-one.csv"), CSV).unwrap();
    let ftp = repaired.column_index("fastq_ftp").unwrap();
    let end = repaired.column_index("end").unwrap();
    assert_eq!(repaired.rows[0][ftp], "r4_1.fastq.gz;r4_2.fastq.gz");
    assert_eq!(repaired.rows[0][end], "PAIRED");
}

#[test]
fn rerun_clears_previous_tables() {
    let (_temp, root) = temp_root();
    let config = resolved(&root, &["X"]);
    fs::create_dir_all(config.results_dir.as_std_path()).unwrap();
    fs::write(config.results_dir.join("stale.tsv").as_std_path(), HEADER).unwrap();

    let app = App::new(Store::new(config.results_dir.clone()), MockEna::default());
    let result = app.run(&config, &NoopSink).unwrap();

    assert_eq!(result.merged_rows, None);
    assert!(file_names(&config.results_dir).is_empty());
}
