// ❗ Error kinds for the ETL run
// Every variant is fatal: the pipeline stops at the first one it meets

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("rate source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rate data: {0}")]
    MalformedRateData(String),

    #[error("network error fetching {url}: {message}")]
    NetworkError { url: String, message: String },

    #[error("no table body found in page")]
    NoTableFound,

    #[error("malformed page: {0}")]
    MalformedPage(String),

    #[error("missing exchange rate for {0}")]
    MissingRate(String),

    #[error("query failed: {sql}: {message}")]
    QueryError { sql: String, message: String },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type EtlResult<T> = Result<T, EtlError>;

impl EtlError {
    pub fn malformed_rates(msg: impl Into<String>) -> Self {
        Self::MalformedRateData(msg.into())
    }

    pub fn malformed_page(msg: impl Into<String>) -> Self {
        Self::MalformedPage(msg.into())
    }

    pub fn query(sql: &str, msg: impl ToString) -> Self {
        Self::QueryError {
            sql: sql.to_string(),
            message: msg.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
