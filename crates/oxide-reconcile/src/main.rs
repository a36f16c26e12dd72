//! oxide-reconcile CLI
//!
//! Command-line tool that reconciles a database with a JSON schema file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_reconcile::prelude::*;

/// Declarative schema reconciliation for SQL databases.
#[derive(Parser)]
#[command(name = "oxide-reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (sqlite:, postgres:// or mysql://).
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// Dialect (generic, sqlite, postgres, mysql); inferred from the URL if omitted.
    #[arg(long)]
    dialect: Option<Dialect>,

    /// JSON schema file.
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Naming strategy (identity, lower, snake, rails, prefix).
    #[arg(short, long)]
    naming: Option<NamingStrategy>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables, columns and indexes.
    Migrate,

    /// Report missing tables and columns without changing anything.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => ReconcileConfig::load(path)?,
        None => ReconcileConfig::default(),
    };
    if cli.database.is_some() {
        config.database_url = cli.database;
    }
    if cli.dialect.is_some() {
        config.dialect = cli.dialect;
    }
    if cli.schema.is_some() {
        config.schema = cli.schema;
    }
    if let Some(strategy) = cli.naming {
        config.naming.strategy = strategy;
    }

    let url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no database URL; use --database or DATABASE_URL"))?;
    let schema = config.load_schema()?;
    let dialect = config.resolved_dialect();

    let pool = connect(&url).await?;
    let mut db = Database::new(pool, schema, dialect, config.translator());

    match cli.command {
        Commands::Migrate => {
            info!(%dialect, "Reconciling {} table(s)", db.schema().tables.len());
            db.migrate().await?;
        }

        Commands::Check => {
            if db.up_to_date().await? {
                info!("Database is up to date.");
            } else {
                println!("\nPending changes:");
                println!("{:-<60}", "");
                for table in db.new_tables() {
                    println!(" [+] {table}");
                }
                for table in db.modified_tables() {
                    println!(" [~] {table}");
                }
                println!();
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
