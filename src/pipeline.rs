// 🚚 Pipeline driver
// extract → transform → flat file → store → queries, strictly in sequence.
// The first error stops the run; nothing already written is rolled back.

use tracing::info;

use crate::config::PipelineConfig;
use crate::db::{self, QueryOutput};
use crate::error::EtlResult;
use crate::extract::{extract_banks, PageSource};
use crate::load;
use crate::model::{BankRow, RawBankRow, EXTRACT_COLUMNS};
use crate::progress_log::{ProgressLog, Stage};
use crate::rates::load_rates;
use crate::transform::transform;

/// Hooks for reporting intermediate results. Every method defaults to a no-op.
pub trait RunObserver {
    fn extracted(&mut self, _rows: &[RawBankRow]) {}

    fn transformed(&mut self, _rows: &[BankRow]) {}

    fn query_done(&mut self, _output: &QueryOutput) {}
}

/// Observer that reports nothing
pub struct Quiet;

impl RunObserver for Quiet {}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    /// Hex SHA-256 of the flat file; equal across runs with equal inputs
    pub csv_sha256: String,
    pub queries: Vec<QueryOutput>,
}

/// Run the whole ETL once.
///
/// The store connection is opened after the flat file is written and is
/// released on every exit path; on success it is closed explicitly so a
/// failing close is reported.
pub fn run(
    config: &PipelineConfig,
    source: &dyn PageSource,
    log: &ProgressLog,
    observer: &mut dyn RunObserver,
) -> EtlResult<RunSummary> {
    log.stage(Stage::Started)?;

    // Extract
    let raw = extract_banks(source, &config.url, &EXTRACT_COLUMNS)?;
    observer.extracted(&raw);
    log.stage(Stage::Extracted)?;

    // Transform
    let rates = load_rates(&config.rate_path)?;
    let banks = transform(raw, &rates)?;
    observer.transformed(&banks);
    log.stage(Stage::Transformed)?;

    // Load: flat file
    load::write_csv(&banks, &config.csv_path)?;
    let csv_sha256 = load::file_sha256(&config.csv_path)?;
    log.stage(Stage::CsvSaved)?;

    // Load: store
    let conn = db::open_store(&config.db_path)?;
    log.stage(Stage::StoreOpened)?;

    db::load_table(&conn, &banks, &config.table_name)?;
    log.stage(Stage::TableLoaded)?;

    let mut queries = Vec::new();
    for sql in db::standard_queries(&config.table_name) {
        let output = db::run_query(&conn, &sql)?;
        observer.query_done(&output);
        queries.push(output);
    }
    log.stage(Stage::Complete)?;

    conn.close().map_err(|(_, e)| e)?;
    log.stage(Stage::StoreClosed)?;

    info!(rows = banks.len(), csv_sha256 = %csv_sha256, "run finished");
    Ok(RunSummary {
        rows: banks.len(),
        csv_sha256,
        queries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::extract::StaticPageSource;
    use rusqlite::types::Value;
    use std::fs;
    use tempfile::TempDir;

    const PAGE: &str = "<table><tbody>\
        <tr><th>Rank</th><th>Bank</th><th>Cap</th></tr>\
        <tr><td>1</td><td>Bank A</td><td>100.0</td></tr>\
        <tr><td>2</td><td>Bank B</td><td>25.0</td></tr>\
        </tbody></table>";

    fn setup(dir: &TempDir, rates: &str) -> (PipelineConfig, ProgressLog) {
        let rate_path = dir.path().join("exchange_rate.csv");
        fs::write(&rate_path, rates).unwrap();
        let config = PipelineConfig {
            url: "http://archive.test/banks".to_string(),
            db_path: dir.path().join("Banks.db"),
            table_name: "Largest_banks".to_string(),
            csv_path: dir.path().join("Largest_banks_data.csv"),
            rate_path,
            log_path: dir.path().join("code_log.txt"),
        };
        let log = ProgressLog::new(&config.log_path);
        (config, log)
    }

    fn log_lines(log: &ProgressLog) -> Vec<String> {
        fs::read_to_string(log.path())
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        extracted: usize,
        transformed: usize,
        queries: Vec<String>,
    }

    impl RunObserver for Recorder {
        fn extracted(&mut self, rows: &[RawBankRow]) {
            self.extracted = rows.len();
        }

        fn transformed(&mut self, rows: &[BankRow]) {
            self.transformed = rows.len();
        }

        fn query_done(&mut self, output: &QueryOutput) {
            self.queries.push(output.sql.clone());
        }
    }

    #[test]
    fn test_full_run() {
        let dir = TempDir::new().unwrap();
        let (config, log) = setup(&dir, "Currency,Rate\nGBP,0.8\nEUR,0.93\nINR,82.1\n");
        let mut recorder = Recorder::default();

        let summary = run(&config, &StaticPageSource::new(PAGE), &log, &mut recorder).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(recorder.extracted, 2);
        assert_eq!(recorder.transformed, 2);
        assert_eq!(recorder.queries.len(), 3);
        assert_eq!(summary.queries[1].scalar(), Some(&Value::Real(50.0)));

        let lines = log_lines(&log);
        assert_eq!(lines.len(), 8);
        assert!(lines[7].ends_with(" : Server Connection closed"));
    }

    #[test]
    fn test_missing_rate_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (config, log) = setup(&dir, "Currency,Rate\nGBP,0.8\nEUR,0.93\n");

        let err = run(&config, &StaticPageSource::new(PAGE), &log, &mut Quiet).unwrap_err();

        assert!(matches!(err, EtlError::MissingRate(ref c) if c == "INR"), "got {:?}", err);
        assert!(!config.csv_path.exists());
        assert!(!config.db_path.exists());
        assert_eq!(log_lines(&log).len(), 2);
    }

    #[test]
    fn test_csv_write_failure_stops_before_store() {
        let dir = TempDir::new().unwrap();
        let (mut config, log) = setup(&dir, "Currency,Rate\nGBP,0.8\nEUR,0.93\nINR,82.1\n");
        config.csv_path = dir.path().join("no_such_dir").join("Largest_banks_data.csv");
        let mut recorder = Recorder::default();

        let result = run(&config, &StaticPageSource::new(PAGE), &log, &mut recorder);

        assert!(result.is_err(), "run should fail when the CSV cannot be written");
        assert!(!config.csv_path.exists());
        assert!(!config.db_path.exists(), "store must not be opened after a sink failure");
        assert!(recorder.queries.is_empty());

        let lines = log_lines(&log);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with(" : Data transformation complete. Initializing Loading process"));
    }

    #[test]
    fn test_no_table_stops_after_first_entry() {
        let dir = TempDir::new().unwrap();
        let (config, log) = setup(&dir, "Currency,Rate\nGBP,0.8\nEUR,0.93\nINR,82.1\n");
        let source = StaticPageSource::new("<html><body><p>gone</p></body></html>");

        let err = run(&config, &source, &log, &mut Quiet).unwrap_err();

        assert!(matches!(err, EtlError::NoTableFound), "got {:?}", err);
        let lines = log_lines(&log);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" : Preliminaries complete. Initiating ETL process"));
    }
}
