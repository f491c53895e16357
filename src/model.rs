// 🏦 Bank records flowing through the pipeline
// RawBankRow comes out of the page, BankRow goes into both sinks

use std::fmt;

// ============================================================================
// COLUMN NAMES
// ============================================================================

pub const COL_NAME: &str = "Name";
pub const COL_MC_USD: &str = "MC_USD_Billions";
pub const COL_MC_GBP: &str = "MC_GBP_Billion";
pub const COL_MC_EUR: &str = "MC_EUR_Billion";
pub const COL_MC_INR: &str = "MC_INR_Billion";

/// Columns the extractor produces, in order
pub const EXTRACT_COLUMNS: [&str; 2] = [COL_NAME, COL_MC_USD];

/// Columns of the final table, in order
pub const TABLE_COLUMNS: [&str; 5] = [COL_NAME, COL_MC_USD, COL_MC_GBP, COL_MC_EUR, COL_MC_INR];

// ============================================================================
// CURRENCY
// ============================================================================

/// Target currencies for the derived columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Gbp,
    Eur,
    Inr,
}

impl Currency {
    /// Derived columns are appended in this order
    pub const TARGETS: [Currency; 3] = [Currency::Gbp, Currency::Eur, Currency::Inr];

    /// ISO code as it appears in the rate source
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }

    /// Name of the derived column holding values in this currency
    pub fn column(&self) -> &'static str {
        match self {
            Currency::Gbp => COL_MC_GBP,
            Currency::Eur => COL_MC_EUR,
            Currency::Inr => COL_MC_INR,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// One row as read off the page: trimmed cell text, nothing coerced yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBankRow {
    pub name: String,
    pub mc_usd: String,
}

impl RawBankRow {
    pub fn new(name: impl Into<String>, mc_usd: impl Into<String>) -> Self {
        RawBankRow {
            name: name.into(),
            mc_usd: mc_usd.into(),
        }
    }
}

/// Final record. `None` marks a value that could not be parsed and
/// propagates into every derived column.
#[derive(Debug, Clone, PartialEq)]
pub struct BankRow {
    pub name: String,
    pub mc_usd_billions: Option<f64>,
    pub mc_gbp_billion: Option<f64>,
    pub mc_eur_billion: Option<f64>,
    pub mc_inr_billion: Option<f64>,
}

impl BankRow {
    /// Value of the derived column for `currency`
    pub fn converted(&self, currency: Currency) -> Option<f64> {
        match currency {
            Currency::Gbp => self.mc_gbp_billion,
            Currency::Eur => self.mc_eur_billion,
            Currency::Inr => self.mc_inr_billion,
        }
    }

    /// Numeric columns in table order (USD, GBP, EUR, INR)
    pub fn amounts(&self) -> [Option<f64>; 4] {
        [
            self.mc_usd_billions,
            self.mc_gbp_billion,
            self.mc_eur_billion,
            self.mc_inr_billion,
        ]
    }
}

/// Full result set, in page row order
pub type BanksTable = Vec<BankRow>;

/// Render a number the way the flat file and console report show it:
/// shortest round-trip digits, always with a fractional part.
/// Values at or above 1e16 print as `1e16`, not `1e+16`; no market cap gets there.
pub fn format_amount(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:?}", v),
        None => String::new(),
    }
}
