// 🔁 Currency Transformer
// Coerces USD text to numbers and appends GBP/EUR/INR columns

use tracing::{debug, warn};

use crate::error::EtlResult;
use crate::model::{BankRow, BanksTable, Currency, RawBankRow};
use crate::rates::RateTable;

/// Resolved multipliers for the three target currencies
#[derive(Debug, Clone, Copy)]
struct TargetRates {
    gbp: f64,
    eur: f64,
    inr: f64,
}

impl TargetRates {
    fn resolve(rates: &RateTable) -> EtlResult<Self> {
        Ok(TargetRates {
            gbp: rates.rate(Currency::Gbp)?,
            eur: rates.rate(Currency::Eur)?,
            inr: rates.rate(Currency::Inr)?,
        })
    }
}

/// Convert extracted rows into the final table.
///
/// Rows keep their order and count. A USD value that is not a finite number
/// becomes `None` in every numeric column instead of failing the run.
///
/// # Errors
/// * `MissingRate` - GBP, EUR or INR is absent; checked before any row
pub fn transform(rows: Vec<RawBankRow>, rates: &RateTable) -> EtlResult<BanksTable> {
    let targets = TargetRates::resolve(rates)?;

    let table: BanksTable = rows
        .into_iter()
        .map(|raw| {
            let usd = parse_usd(&raw.mc_usd);
            if usd.is_none() {
                warn!(name = %raw.name, value = %raw.mc_usd, "market cap is not numeric");
            }
            BankRow {
                mc_usd_billions: usd,
                mc_gbp_billion: usd.map(|v| convert(v, targets.gbp)),
                mc_eur_billion: usd.map(|v| convert(v, targets.eur)),
                mc_inr_billion: usd.map(|v| convert(v, targets.inr)),
                name: raw.name,
            }
        })
        .collect();

    debug!(rows = table.len(), "transformation complete");
    Ok(table)
}

/// Lenient numeric coercion: anything unparseable or non-finite is `None`
pub fn parse_usd(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `usd * rate`, rounded to 2 decimals
pub fn convert(usd: f64, rate: f64) -> f64 {
    round2(usd * rate)
}

/// Round to 2 decimal places, ties to even on the scaled value
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
