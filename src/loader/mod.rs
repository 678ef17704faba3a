pub mod connection;
pub mod integrity;
pub mod schema;
pub mod table_loader;

pub use connection::{check_connection, connect, set_foreign_key_checks};
pub use integrity::{ForeignKey, OrphanReport, find_orphans};
pub use schema::{SchemaInitializer, split_statements};
pub use table_loader::{PreparedTable, SqlValue, insert_rows, prepare_table};

use sqlx::Connection;
use sqlx::mysql::MySqlConnection;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{EtlError, EtlResult};
use crate::models::TableSpec;
use crate::storage::CsvStorage;

#[derive(Debug)]
pub enum TableOutcome {
    Loaded { rows: u64 },
    Skipped,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub tables: Vec<(String, TableOutcome)>,
    pub orphans: Vec<OrphanReport>,
}

impl LoadReport {
    pub fn loaded(&self) -> usize {
        self.tables
            .iter()
            .filter(|(_, o)| matches!(o, TableOutcome::Loaded { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.tables
            .iter()
            .filter(|(_, o)| matches!(o, TableOutcome::Skipped))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.tables
            .iter()
            .filter(|(_, o)| matches!(o, TableOutcome::Failed(_)))
            .count()
    }
}

/// Stage two: append every cleaned file to its warehouse table.
///
/// All tables go through one connection with foreign key checks off, since
/// the fixed order doesn't guarantee parents land before children. Checks are
/// switched back on however the individual tables fared.
pub struct Loader<'a> {
    config: &'a PipelineConfig,
    storage: CsvStorage,
}

impl<'a> Loader<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            storage: CsvStorage::new(&config.paths.raw_dir, &config.paths.cleaned_dir),
        }
    }

    pub async fn run(&self, plan: &[TableSpec]) -> EtlResult<LoadReport> {
        info!("--- Starting Data Load ---");

        let mut conn = connect(&self.config.database.database_options()).await?;
        set_foreign_key_checks(&mut conn, false).await?;

        let mut report = LoadReport::default();
        for spec in plan {
            let outcome = match self.load_table(&mut conn, spec).await {
                Ok(rows) => {
                    info!("   -> Success: Loaded {} rows into {}.", rows, spec.table);
                    TableOutcome::Loaded { rows }
                }
                Err(EtlError::MissingInput(path)) => {
                    warn!("Skipping {}: File not found ({})", spec.table, path.display());
                    TableOutcome::Skipped
                }
                Err(e) => {
                    error!("   -> ERROR loading {}: {:?}", spec.table, e);
                    TableOutcome::Failed(e.to_string())
                }
            };
            report.tables.push((spec.table.to_string(), outcome));
        }

        // Table outcomes are final here; teardown failures are only logged
        match set_foreign_key_checks(&mut conn, true).await {
            Ok(()) if self.config.load.verify_integrity => {
                match find_orphans(&mut conn, &self.config.database.database).await {
                    Ok(orphans) => report.orphans = orphans,
                    Err(e) => warn!("Integrity verification could not run: {}", e),
                }
            }
            Ok(()) => {}
            Err(e) => error!("❌ Could not re-enable foreign key checks: {}", e),
        }

        if let Err(e) = conn.close().await {
            warn!("Closing the load connection failed: {}", e);
        }

        info!(
            "--- Data Load Complete: {} loaded, {} skipped, {} failed, \
             {} foreign keys with orphans ---",
            report.loaded(),
            report.skipped(),
            report.failed(),
            report.orphans.len()
        );
        Ok(report)
    }

    /// One table inside its own transaction, so a failure leaves it empty
    /// rather than half-loaded.
    async fn load_table(&self, conn: &mut MySqlConnection, spec: &TableSpec) -> EtlResult<u64> {
        let df = self.storage.load_cleaned(spec.source_file)?;
        info!("Loading {} ({} rows)...", spec.table, df.height());

        let prepared = prepare_table(spec, &df)?;

        let mut tx = conn.begin().await?;
        let rows = insert_rows(&mut tx, &prepared, self.config.load.batch_size).await?;
        tx.commit().await?;

        Ok(rows)
    }
}
