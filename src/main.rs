use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod db;
mod error;
mod kinematics;
mod models;
mod snapshot;
mod store;

use crate::db::PgEventStore;
use crate::models::DailyCount;

#[derive(Parser)]
#[command(name = "prospector-metrics")]
#[command(about = "Pipeline velocity and growth metrics for the Prospector dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample runs and prospects
    Seed,
    /// Compute the dashboard snapshot as JSON
    Snapshot {
        #[arg(long, default_value_t = aggregate::DEFAULT_WINDOW_DAYS)]
        window_days: i64,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Emit single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Compute position, velocity and acceleration from a date,count CSV
    Pva {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} sample prospects.");
        }
        Commands::Snapshot {
            window_days,
            out,
            compact,
        } => {
            let store = PgEventStore::new(connect().await?);
            let snapshot = snapshot::build_snapshot(&store, window_days, Utc::now())
                .await
                .context("failed to build metrics snapshot")?;

            let body = if compact {
                serde_json::to_string(&snapshot)?
            } else {
                serde_json::to_string_pretty(&snapshot)?
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, body)?;
                    println!("Snapshot written to {}.", path.display());
                }
                None => println!("{body}"),
            }
        }
        Commands::Pva { csv } => {
            let daily = read_daily_counts(&csv)?;
            let summary = kinematics::compute_pva(&daily)
                .with_context(|| format!("invalid daily counts in {}", csv.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the Prospector Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    info!("connected to event store");
    Ok(pool)
}

fn read_daily_counts(path: &Path) -> anyhow::Result<Vec<DailyCount>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut daily = Vec::new();
    for result in reader.deserialize::<DailyCount>() {
        daily.push(result?);
    }
    Ok(daily)
}
