use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grants_core::GrantRepository;
use grants_core::flagging::{NotableRules, flag_notable_grants};
use grants_data::{DomesticGrantImporter, GacGrantImporter, TaxBracketLoader};
use grants_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Load grant corpora and tax brackets into the grants database.
#[derive(Parser, Debug)]
#[command(name = "grants-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// SQLite database URL (e.g., sqlite:grants.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:grants.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace tax brackets from a `tax_year,min_income,max_income,rate` CSV
    Brackets {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Import domestic grant exports (fiscal year taken from each file name)
    Domestic {
        #[arg(long, default_value = "csv")]
        csv_dir: PathBuf,

        /// Delete all domestic grants first
        #[arg(long)]
        clear: bool,

        /// Skip notable flagging after the import
        #[arg(long)]
        no_flag: bool,
    },

    /// Import GFC_operational.csv, GFC_closed.csv and GFC_terminating.csv
    Gac {
        #[arg(long, default_value = "csv/GFC_data")]
        csv_dir: PathBuf,

        /// Delete all GAC projects first
        #[arg(long)]
        clear: bool,
    },

    /// Run the notable-grant rules over stored grants
    Flag {
        /// Clear existing flags before flagging
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    match args.command {
        Command::Brackets { file } => {
            println!("Loading tax brackets from: {}", file.display());
            let reader = File::open(&file)
                .with_context(|| format!("Failed to open: {}", file.display()))?;
            let records = TaxBracketLoader::parse(reader)
                .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;
            println!("Parsed {} records from CSV", records.len());

            let summary = TaxBracketLoader::load(&repo, &records)
                .await
                .context("Failed to load tax brackets into database")?;
            println!("Loaded tax brackets: {}", summary);
        }
        Command::Domestic {
            csv_dir,
            clear,
            no_flag,
        } => {
            if clear {
                let removed = repo
                    .delete_all_grants()
                    .await
                    .context("Failed to clear grants")?;
                println!("Cleared {} existing grants.", removed);
            }

            let summary = DomesticGrantImporter::import_dir(&repo, &csv_dir)
                .await
                .with_context(|| format!("Failed to import grants from: {}", csv_dir.display()))?;
            println!("Imported grants: {}", summary);

            if !no_flag {
                let flagged = flag_notable_grants(&repo, &NotableRules::standard(), false)
                    .await
                    .context("Failed to flag notable grants")?;
                println!("Flagged {} notable grants.", flagged);
            }

            let total = repo.count_grants().await.context("Failed to count grants")?;
            println!("Database now holds {} grants.", total);
        }
        Command::Gac { csv_dir, clear } => {
            if clear {
                let removed = repo
                    .delete_all_gac_grants()
                    .await
                    .context("Failed to clear GAC projects")?;
                println!("Cleared {} existing GAC projects.", removed);
            }

            let today = chrono::Local::now().date_naive();
            let summary = GacGrantImporter::import_dir(&repo, &csv_dir, today)
                .await
                .with_context(|| {
                    format!("Failed to import GAC projects from: {}", csv_dir.display())
                })?;
            println!("Imported GAC projects: {}", summary);
        }
        Command::Flag { reset } => {
            let flagged = flag_notable_grants(&repo, &NotableRules::standard(), reset)
                .await
                .context("Failed to flag notable grants")?;
            println!("Flagged {} notable grants.", flagged);
        }
    }

    Ok(())
}
