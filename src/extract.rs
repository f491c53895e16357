// 🌐 Page Extractor
// Fetches the archived bank ranking page and reads (name, USD market cap) rows
// out of the first table body.

use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{EtlError, EtlResult};
use crate::model::{RawBankRow, EXTRACT_COLUMNS};

// ============================================================================
// PAGE SOURCES
// ============================================================================

/// Where page HTML comes from.
///
/// The pipeline only ever uses `HttpPageSource`; tests plug in fixed documents.
pub trait PageSource {
    /// Return the document body for `url`
    fn fetch(&self, url: &str) -> EtlResult<String>;
}

/// Single blocking GET, no status check, no retry, no timeout
pub struct HttpPageSource {
    client: reqwest::blocking::Client,
    timeout: Option<Duration>,
}

impl HttpPageSource {
    pub fn new() -> EtlResult<Self> {
        // reqwest's blocking client gives up after 30s unless told otherwise
        let timeout: Option<Duration> = None;
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("bank-etl/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| EtlError::NetworkError {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(HttpPageSource { client, timeout })
    }

    /// Request timeout the client was built with
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, url: &str) -> EtlResult<String> {
        let network_error = |e: reqwest::Error| EtlError::NetworkError {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            // Accepted anyway; the body decides whether a table is there
            warn!(%url, %status, "non-success status from page fetch");
        }

        let body = response.text().map_err(network_error)?;
        debug!(%url, %status, bytes = body.len(), "page fetched");
        Ok(body)
    }
}

/// Serves one fixed document regardless of URL
pub struct StaticPageSource {
    html: String,
}

impl StaticPageSource {
    pub fn new(html: impl Into<String>) -> Self {
        StaticPageSource { html: html.into() }
    }
}

impl PageSource for StaticPageSource {
    fn fetch(&self, _url: &str) -> EtlResult<String> {
        Ok(self.html.clone())
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Fetch `url` from `source` and parse the bank rows out of it.
///
/// # Arguments
/// * `columns` - expected output columns, must be `["Name", "MC_USD_Billions"]`
///
/// # Errors
/// * `NetworkError` - fetch failed
/// * `NoTableFound` - no `<tbody>` tag in the page source
/// * `MalformedPage` - unsupported column list, or a data row too short to
///   hold the name and market cap cells
pub fn extract_banks(
    source: &dyn PageSource,
    url: &str,
    columns: &[&str],
) -> EtlResult<Vec<RawBankRow>> {
    let html = source.fetch(url)?;
    let rows = parse_banks_table(&html, columns)?;
    info!(%url, rows = rows.len(), "extraction complete");
    Ok(rows)
}

/// Parse bank rows from the first table body of `html`, in document order.
/// Only `<tbody>` tags written in the source count; the bodies the HTML5
/// tree builder adds to bare `<table>`s are ignored.
/// Rows without `td` cells (headers, separators) are skipped.
pub fn parse_banks_table(html: &str, columns: &[&str]) -> EtlResult<Vec<RawBankRow>> {
    if columns != EXTRACT_COLUMNS.as_slice() {
        return Err(EtlError::malformed_page(format!(
            "unsupported column layout {:?}, expected {:?}",
            columns, EXTRACT_COLUMNS
        )));
    }

    let document = Html::parse_document(&mark_source_tbody(html));
    let tbody_sel = selector(&format!("tbody[{}]", SOURCE_TBODY_ATTR))?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;

    let tbody = document
        .select(&tbody_sel)
        .next()
        .ok_or(EtlError::NoTableFound)?;

    let mut rows = Vec::new();
    for (row_idx, tr) in tbody.select(&tr_sel).enumerate() {
        let cells: Vec<ElementRef> = tr.select(&td_sel).collect();
        if cells.is_empty() {
            continue;
        }
        let row = read_bank_cells(&cells).ok_or_else(|| {
            EtlError::malformed_page(format!(
                "row {} has {} data cells, need at least 3",
                row_idx,
                cells.len()
            ))
        })?;
        rows.push(row);
    }

    Ok(rows)
}

/// Attribute stamped on every `<tbody>` tag present in the raw page
const SOURCE_TBODY_ATTR: &str = "data-source-tbody";

/// Tag each literal `<tbody` open tag with `SOURCE_TBODY_ATTR` before parsing.
/// Matches inside comments or scripts never become elements, so they are harmless.
fn mark_source_tbody(html: &str) -> String {
    const OPEN: &[u8] = b"<tbody";

    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len() + 64);
    let mut copied = 0;

    for i in 0..bytes.len().saturating_sub(OPEN.len() - 1) {
        let end = i + OPEN.len();
        if !bytes[i..end].eq_ignore_ascii_case(OPEN) {
            continue;
        }
        let at_tag_end = bytes
            .get(end)
            .map_or(true, |b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
        if at_tag_end {
            // `end` follows ASCII bytes, so it is a char boundary
            out.push_str(&html[copied..end]);
            out.push(' ');
            out.push_str(SOURCE_TBODY_ATTR);
            copied = end;
        }
    }

    out.push_str(&html[copied..]);
    out
}

/// Layout of the ranking table: cell 0 is the rank, cell 1 the bank name,
/// cell 2 the market cap in USD billions. Page format changes land here.
pub fn read_bank_cells(cells: &[ElementRef]) -> Option<RawBankRow> {
    let name = cell_text(cells.get(1)?);
    let mc_usd = cell_text(cells.get(2)?);
    Some(RawBankRow::new(name, mc_usd))
}

/// All descendant text of a cell, trimmed
fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> EtlResult<Selector> {
    Selector::parse(css)
        .map_err(|e| EtlError::malformed_page(format!("bad selector {}: {:?}", css, e)))
}
