// 💾 Flat-file sink
// Writes the final table as CSV with a leading row-index column

use csv::{QuoteStyle, WriterBuilder};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::EtlResult;
use crate::model::{format_amount, BankRow, TABLE_COLUMNS};

/// Write `rows` to `path`, replacing whatever was there.
///
/// Header: empty index column name, then the table columns.
/// Missing amounts are written as empty fields.
pub fn write_csv(rows: &[BankRow], path: &Path) -> EtlResult<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_path(path)?;

    let mut header = vec![""];
    header.extend_from_slice(&TABLE_COLUMNS);
    writer.write_record(&header)?;

    for (idx, row) in rows.iter().enumerate() {
        let mut record = Vec::with_capacity(TABLE_COLUMNS.len() + 1);
        record.push(idx.to_string());
        record.push(row.name.clone());
        record.extend(row.amounts().into_iter().map(format_amount));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "flat file written");
    Ok(())
}

/// Hex SHA-256 of a file's bytes, used to compare outputs across runs
pub fn file_sha256(path: &Path) -> EtlResult<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}
