use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use bank_etl::model::{format_amount, EXTRACT_COLUMNS, TABLE_COLUMNS};
use bank_etl::{
    run, BankRow, CliArgs, HttpPageSource, PipelineConfig, ProgressLog, QueryOutput, RawBankRow,
    RunObserver,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run_cli(args) {
        eprintln!("❌ ETL run failed: {:#}", e);
        process::exit(1);
    }
}

fn run_cli(args: CliArgs) -> Result<()> {
    let config = args.into_config().context("Invalid configuration")?;
    run_etl(&config)
}

fn run_etl(config: &PipelineConfig) -> Result<()> {
    println!("🏦 Largest Banks ETL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🌐 Source: {}", config.url);

    let source = HttpPageSource::new().context("Failed to set up HTTP client")?;
    let log = ProgressLog::new(&config.log_path);
    let mut printer = ConsolePrinter;

    let summary = run(config, &source, &log, &mut printer).context("Pipeline aborted")?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {} banks processed", summary.rows);
    println!("✓ CSV:   {}", config.csv_path.display());
    println!("✓ Table: {} in {}", config.table_name, config.db_path.display());
    println!("✓ CSV sha256: {}", summary.csv_sha256);

    Ok(())
}

/// Prints each intermediate table and every query result
struct ConsolePrinter;

impl RunObserver for ConsolePrinter {
    fn extracted(&mut self, rows: &[RawBankRow]) {
        println!("\n📂 Extraction output ({} rows)", rows.len());
        println!("   {:>3}  {}", "", EXTRACT_COLUMNS.join(" | "));
        for (idx, row) in rows.iter().enumerate() {
            println!("   {:>3}  {} | {}", idx, row.name, row.mc_usd);
        }
    }

    fn transformed(&mut self, rows: &[BankRow]) {
        println!("\n💱 Transform output ({} rows)", rows.len());
        println!("   {:>3}  {}", "", TABLE_COLUMNS.join(" | "));
        for (idx, row) in rows.iter().enumerate() {
            let amounts: Vec<String> = row
                .amounts()
                .into_iter()
                .map(|v| match v {
                    Some(_) => format_amount(v),
                    None => "NaN".to_string(),
                })
                .collect();
            println!("   {:>3}  {} | {}", idx, row.name, amounts.join(" | "));
        }
    }

    fn query_done(&mut self, output: &QueryOutput) {
        println!("\n🔍 {}", output.sql);
        println!("{}", output);
    }
}
