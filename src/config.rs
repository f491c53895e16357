// ⚙️ Pipeline configuration
// Defaults, optionally overridden by a JSON file, then by command-line flags

use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, EtlResult};

pub const DEFAULT_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Page with the ranking table
    pub url: String,

    pub db_path: PathBuf,

    /// Replaced on every run
    pub table_name: String,

    pub csv_path: PathBuf,

    /// `Currency,Rate` file
    pub rate_path: PathBuf,

    pub log_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            url: DEFAULT_URL.to_string(),
            db_path: PathBuf::from("Banks.db"),
            table_name: "Largest_banks".to_string(),
            csv_path: PathBuf::from("./Largest_banks_data.csv"),
            rate_path: PathBuf::from("./exchange_rate.csv"),
            log_path: PathBuf::from("./code_log.txt"),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> EtlResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| EtlError::config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| EtlError::config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> EtlResult<()> {
        if self.url.trim().is_empty() {
            return Err(EtlError::config("url must not be empty"));
        }
        if self.table_name.trim().is_empty() {
            return Err(EtlError::config("table name must not be empty"));
        }
        Ok(())
    }
}

/// Scrape the largest-banks table, convert market caps, and load CSV + SQLite
#[derive(Parser, Debug)]
#[command(name = "bank-etl")]
#[command(version)]
#[command(about = "Scrape the largest-banks table, convert market caps to GBP/EUR/INR, load CSV + SQLite")]
pub struct CliArgs {
    /// JSON file with any of the settings below
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Page holding the bank ranking table
    #[arg(long)]
    pub url: Option<String>,

    /// SQLite database file
    #[arg(long = "db", value_name = "FILE")]
    pub db_path: Option<PathBuf>,

    /// Table to (re)create in the database
    #[arg(long = "table", value_name = "NAME")]
    pub table_name: Option<String>,

    /// Flat-file output path
    #[arg(long = "csv", value_name = "FILE")]
    pub csv_path: Option<PathBuf>,

    /// Exchange rate CSV (Currency,Rate)
    #[arg(long = "rates", value_name = "FILE")]
    pub rate_path: Option<PathBuf>,

    /// Progress log file
    #[arg(long = "log", value_name = "FILE")]
    pub log_path: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the run configuration: defaults, then `--config`, then flags
    pub fn into_config(self) -> EtlResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(path) = self.db_path {
            config.db_path = path;
        }
        if let Some(name) = self.table_name {
            config.table_name = name;
        }
        if let Some(path) = self.csv_path {
            config.csv_path = path;
        }
        if let Some(path) = self.rate_path {
            config.rate_path = path;
        }
        if let Some(path) = self.log_path {
            config.log_path = path;
        }

        config.validate()?;
        Ok(config)
    }
}
