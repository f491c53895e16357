// 💱 Rate Table Loader
// Reads the static Currency,Rate file into an immutable lookup

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::model::Currency;

const COL_CURRENCY: &str = "Currency";
const COL_RATE: &str = "Rate";

/// One line of the rate source
#[derive(Debug, Deserialize)]
struct RateRecord {
    #[serde(rename = "Currency")]
    currency: String,

    #[serde(rename = "Rate")]
    rate: f64,
}

/// Currency code -> multiplier applied to USD amounts.
/// Built once per run and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Build from (code, rate) pairs, enforcing the same rules as the file loader
    pub fn from_pairs<I, S>(pairs: I) -> EtlResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut rates = BTreeMap::new();
        for (code, rate) in pairs {
            let code: String = code.into();
            let code = code.trim().to_string();
            if code.is_empty() {
                return Err(EtlError::malformed_rates("empty currency code"));
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(EtlError::malformed_rates(format!(
                    "rate for {} must be a positive number, got {}",
                    code, rate
                )));
            }
            if rates.insert(code.clone(), rate).is_some() {
                return Err(EtlError::malformed_rates(format!(
                    "duplicate currency code {}",
                    code
                )));
            }
        }
        Ok(RateTable { rates })
    }

    /// Raw lookup by code
    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Rate for one of the target currencies, or `MissingRate`
    pub fn rate(&self, currency: Currency) -> EtlResult<f64> {
        self.get(currency.code())
            .ok_or_else(|| EtlError::MissingRate(currency.code().to_string()))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Load the rate table from a `Currency,Rate` file.
///
/// # Errors
/// * `SourceUnavailable` - the file cannot be opened or read
/// * `MalformedRateData` - a column is missing, a rate is not a positive
///   number, or a code repeats
pub fn load_rates(path: &Path) -> EtlResult<RateTable> {
    let file = File::open(path).map_err(|source| EtlError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| rate_read_error(path, e))?
        .clone();
    for required in [COL_CURRENCY, COL_RATE] {
        if !headers.iter().any(|h| h == required) {
            return Err(EtlError::malformed_rates(format!(
                "{} has no {} column",
                path.display(),
                required
            )));
        }
    }

    let mut pairs = Vec::new();
    for (line_num, result) in reader.deserialize::<RateRecord>().enumerate() {
        // +2: 1-indexed plus the header row
        let record = result.map_err(|e| match rate_read_error(path, e) {
            EtlError::MalformedRateData(msg) => {
                EtlError::malformed_rates(format!("line {}: {}", line_num + 2, msg))
            }
            other => other,
        })?;
        pairs.push((record.currency, record.rate));
    }

    let table = RateTable::from_pairs(pairs)?;
    debug!(path = %path.display(), currencies = table.len(), "rate table loaded");
    Ok(table)
}

fn rate_read_error(path: &Path, err: csv::Error) -> EtlError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(source) => EtlError::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            },
            other => EtlError::malformed_rates(format!("{:?}", other)),
        }
    } else {
        EtlError::malformed_rates(err.to_string())
    }
}
