pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod pos;
pub mod seed;
pub mod state;


pub use commands::backup::{BackupData, BackupDocument, BACKUP_VERSION};
pub use commands::ledger::{
    ledger_entries, ledger_stats, LedgerAction, LedgerEntry, LedgerFilter, LedgerPeriod,
    LedgerStats,
};
pub use commands::orders::{TransferMode, TransferOutcome};
pub use commands::payments::{
    PaymentQuote, SplitProgress, SplitSession, Tender, MAX_SPLIT_PERSONS, MIN_SPLIT_PERSONS,
};
pub use commands::reports::{
    CsvReportExporter, DayReport, JsonReportExporter, ProductSales, ReasonStat, ReportExporter,
    WasteGroup,
};
pub use config::PosConfig;
pub use error::{PosError, PosResult};
pub use pos::{CatalogEvent, Pos};
pub use state::PosState;

use tracing::info;

/// Installs logging, makes sure the backup directory exists and opens the
/// till from `config`.
pub fn start(config: &PosConfig) -> PosResult<Pos> {
    logging::init(&config.log_filter);

    std::fs::create_dir_all(&config.backup_dir)?;

    let pos = Pos::open(config)?;
    info!(
        database = %config.database_path().display(),
        backups = %config.backup_dir.display(),
        "Till started"
    );
    Ok(pos)
}
