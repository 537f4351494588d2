use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use quiz_migrate::db::Database;
use quiz_migrate::migrate::Migrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "quiz-migrate")]
#[command(about = "Copy users, questions, stats and tickets from JSON files into the database")]
pub struct Config {
    /// Directory containing users.json, questions.json, stats.json and tickets.json
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Database file path
    #[arg(long, env = "DATABASE_PATH", default_value = "./data/app.duckdb")]
    pub database: PathBuf,

    /// Report what would be inserted without committing
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// Log line format (logs go to stderr)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quiz_migrate=info".into());

    let fmt_layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::parse();
    init_tracing(config.log_format);

    tracing::info!("Starting quiz-migrate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.database.display());

    // Ensure database directory exists
    if let Some(parent) = config.database.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::open(&config.database)?;
    db.ensure_schema()?;

    let migrator = Migrator::new(db, &config.data_dir);
    tracing::info!("Reading data files from {}", migrator.data_dir().display());
    let report = if config.dry_run {
        migrator.plan()?
    } else {
        migrator.run()?
    };

    println!("{report}");
    Ok(())
}
