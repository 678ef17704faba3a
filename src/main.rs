use anyhow::{Context, Result, anyhow};
use ecommerce_etl::cleaner::EcommerceCleaner;
use ecommerce_etl::config::PipelineConfig;
use ecommerce_etl::loader::{Loader, SchemaInitializer, TableOutcome, check_connection};
use ecommerce_etl::models::{LOAD_PLAN, find_table};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "src/configs/pipeline.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Clean,
    Load,
    Check,
    All,
}

impl Stage {
    fn parse(arg: &str) -> Result<Self> {
        match arg {
            "clean" => Ok(Stage::Clean),
            "load" => Ok(Stage::Load),
            "check" => Ok(Stage::Check),
            "all" => Ok(Stage::All),
            other => Err(anyhow!(
                "Unknown stage '{}'. Usage: ecommerce-etl [clean|load|check|all] [--table <name>]",
                other
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let stage = match args.first() {
        Some(arg) if !arg.starts_with("--") => Stage::parse(arg)?,
        _ => Stage::All,
    };
    let table = table_arg(&args);

    let config_path = env::var("ETL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = PipelineConfig::from_file(&config_path)
        .context("Failed to load pipeline configuration")?;
    config.validate().context("Invalid pipeline configuration")?;

    info!("🚀 Starting e-commerce ETL ({:?}) with config {}", stage, config_path);

    if matches!(stage, Stage::Clean | Stage::All) {
        run_clean(&config)?;
    }

    if matches!(stage, Stage::Load | Stage::Check | Stage::All) {
        config
            .database
            .load_credentials()
            .context("Failed to load database credentials")?;
        check_connection(&config.database)
            .await
            .context("Database is unreachable, aborting")?;
    }

    if matches!(stage, Stage::Load | Stage::All) {
        run_load(&config, table.as_deref()).await?;
    }

    info!("🎉 Pipeline finished");
    Ok(())
}

/// Value following `--table`, if any.
fn table_arg(args: &[String]) -> Option<String> {
    args.iter()
        .position(|arg| arg == "--table")
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn run_clean(config: &PipelineConfig) -> Result<()> {
    let cleaner = EcommerceCleaner::new(&config.paths);
    let report = cleaner.run_all().context("Cleaning stage could not start")?;

    info!("✅ Cleaned {} files", report.saved());
    if report.skipped() > 0 {
        warn!("⚠️ {} raw files were missing", report.skipped());
    }
    if report.failed() > 0 {
        error!("❌ {} files failed to clean", report.failed());
    }
    Ok(())
}

async fn run_load(config: &PipelineConfig, table: Option<&str>) -> Result<()> {
    let loader = Loader::new(config);

    let report = match table {
        Some(name) => {
            // Single table into the existing schema, no re-initialization
            let spec = find_table(name)
                .ok_or_else(|| anyhow!("No load mapping for table '{}'", name))?;
            loader.run(std::slice::from_ref(spec)).await?
        }
        None => {
            SchemaInitializer::new(&config.database, &config.paths.schema_path)
                .initialize()
                .await
                .context("Schema initialization failed, aborting load")?;
            loader.run(&LOAD_PLAN).await?
        }
    };

    for (table, outcome) in &report.tables {
        match outcome {
            TableOutcome::Loaded { rows } => info!("📊 {}: {} rows", table, rows),
            TableOutcome::Skipped => warn!("⚠️ {}: skipped", table),
            TableOutcome::Failed(reason) => error!("❌ {}: {}", table, reason),
        }
    }
    for orphan in &report.orphans {
        warn!("⚠️ {} has {} orphan rows", orphan.key, orphan.orphan_rows);
    }

    Ok(())
}
