use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use nutritrack_scores::config::{AppConfig, PatientSource};
use nutritrack_scores::repository::{MemoryRepository, PatientRepository, PgRepository};
use nutritrack_scores::{db, import, report, score, validate};

#[derive(Parser)]
#[command(name = "nutritrack-scores")]
#[command(about = "HEIFA score breakdowns and clinician statistics", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Read patients from a bulk-import CSV instead of Postgres
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// JSON category table replacing the built-in one
    #[arg(long, env = "NUTRITRACK_CATEGORIES", global = true)]
    categories: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import patients from a bulk-import CSV into Postgres
    Import {
        #[arg(long = "file")]
        file: PathBuf,
    },
    /// Show one patient's category breakdown and total
    Breakdown {
        #[arg(long)]
        user_id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show mean HEIFA score by sex
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown clinician report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::resolve(cli.csv, cli.database_url, cli.categories.as_deref())?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import { file } => {
            let pool = connect(&config).await?;
            let summary = import::read_patients_csv(&file)?;
            for entry in validate::validate_population(&summary.patients, &config.categories) {
                for issue in &entry.issues {
                    warn!(user_id = %entry.user_id, %issue, "score issue");
                }
            }
            let written = db::import_patients(&pool, &summary.patients).await?;
            let total = db::count_patients(&pool).await?;
            info!(written, skipped = summary.skipped_rows, total, "import finished");
            println!(
                "Imported {written} patients from {} ({} rows skipped).",
                file.display(),
                summary.skipped_rows
            );
        }
        command => match &config.source {
            PatientSource::Csv(path) => {
                let repo = MemoryRepository::from_csv(path)?;
                run_query(&repo, command, &config).await?;
            }
            PatientSource::Postgres(_) => {
                let repo = PgRepository::new(connect(&config).await?);
                run_query(&repo, command, &config).await?;
            }
        },
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

async fn run_query<R: PatientRepository>(
    repo: &R,
    command: Commands,
    config: &AppConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::Breakdown { user_id, json } => {
            let patient = repo.patient_by_id(&user_id).await?;
            if patient.is_none() {
                println!("No patient with user id {user_id}.");
                return Ok(());
            }
            if json {
                let body = report::breakdown_json(patient.as_ref(), &config.categories)?;
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print!("{}", report::build_breakdown(patient.as_ref(), &config.categories)?);
            }
        }
        Commands::Stats { json } => {
            let patients = repo.all_patients().await?;
            let means = score::compute_mean_by_sex(&patients);
            if json {
                println!("{}", serde_json::to_string_pretty(&means)?);
                return Ok(());
            }
            println!("Mean HEIFA score by sex:");
            for stat in [&means.male, &means.female] {
                println!(
                    "- {:?}: {} across {} patients",
                    stat.sex,
                    score::format_score(stat.mean),
                    stat.count
                );
            }
        }
        Commands::Report { out } => {
            let patients = repo.all_patients().await?;
            let label = match &config.source {
                PatientSource::Csv(path) => Some(path.display().to_string()),
                PatientSource::Postgres(_) => None,
            };
            let report = report::build_report(
                label.as_deref(),
                chrono::Utc::now().date_naive(),
                &patients,
                &config.categories,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::InitDb | Commands::Import { .. } => {
            anyhow::bail!("this command requires DATABASE_URL")
        }
    }

    Ok(())
}
