// Bank ETL - Core Library
// Largest-banks page → currency conversion → CSV + SQLite, run once

pub mod error;
pub mod model;
pub mod config;
pub mod progress_log;
pub mod rates;
pub mod extract;
pub mod transform;
pub mod load;
pub mod db;
pub mod pipeline;

// Re-export commonly used types
pub use error::{EtlError, EtlResult};
pub use model::{
    BankRow, BanksTable, Currency, RawBankRow,
    EXTRACT_COLUMNS, TABLE_COLUMNS,
};
pub use config::{CliArgs, PipelineConfig};
pub use progress_log::{ProgressLog, Stage};
pub use rates::{load_rates, RateTable};
pub use extract::{
    extract_banks, parse_banks_table, read_bank_cells,
    HttpPageSource, PageSource, StaticPageSource,
};
pub use transform::transform;
pub use load::{file_sha256, write_csv};
pub use db::{
    count_rows, get_all_banks, load_table, open_store,
    run_query, standard_queries, QueryOutput,
};
pub use pipeline::{run, Quiet, RunObserver, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
