// 📝 Progress log sink
// Append-only text file, one `<timestamp> : <message>` line per pipeline stage

use chrono::{DateTime, Local, TimeZone};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::EtlResult;

/// Year-MonthAbbrev-Day-Hour:Minute:Second, e.g. `2024-Mar-05-14:07:09`
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

/// Milestones the pipeline records, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Started,
    Extracted,
    Transformed,
    CsvSaved,
    StoreOpened,
    TableLoaded,
    Complete,
    StoreClosed,
}

impl Stage {
    pub fn message(&self) -> &'static str {
        match self {
            Stage::Started => "Preliminaries complete. Initiating ETL process",
            Stage::Extracted => "Data extraction complete. Initializing Transformation process.",
            Stage::Transformed => "Data transformation complete. Initializing Loading process",
            Stage::CsvSaved => "Data saved to csv",
            Stage::StoreOpened => "SQL connection initiated",
            Stage::TableLoaded => "Data loaded to Database as table, Executing queries",
            Stage::Complete => "Process Complete.",
            Stage::StoreClosed => "Server Connection closed",
        }
    }
}

/// Format one log line (without the trailing newline)
pub fn format_line<Tz: TimeZone>(timestamp: &DateTime<Tz>, message: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{} : {}", timestamp.format(TIMESTAMP_FORMAT), message)
}

/// File-backed progress log. The file is opened per entry so every line is
/// on disk before the next stage starts.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProgressLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a free-form message stamped with the local time
    pub fn log(&self, message: &str) -> EtlResult<()> {
        let line = format_line(&Local::now(), message);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Append the message for a pipeline stage
    pub fn stage(&self, stage: Stage) -> EtlResult<()> {
        info!(?stage, "{}", stage.message());
        self.log(stage.message())
    }
}
