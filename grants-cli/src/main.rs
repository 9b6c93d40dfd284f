use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Datelike;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info};

use grants_cli::app::{self, SearchQuery};
use grants_cli::config::{CliOverrides, ConfigError, DEFAULT_LOG_LEVEL, load_config};
use grants_cli::failure::{FailureKind, describe_failure};
use grants_cli::logging::{enable_file_logging, init_logging, set_log_level};
use grants_cli::render;
use grants_cli::utils::parse_amount;
use grants_core::calculations::CalculationRequest;
use grants_core::calculations::report::{DEFAULT_SESSION_KEY, DEFAULT_TAXPAYER_SINCE_YEAR};
use grants_core::GacStatus;
use grants_core::db::{GrantFilter, GrantSort};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// How much of your federal tax goes to Canadian government grants.
///
/// Reads settings from `grants.toml` (optional), opens the configured
/// database and runs one command.
#[derive(Debug, Parser)]
#[command(name = "grants", version)]
struct Cli {
    /// Configuration file. Defaults to `grants.toml` when it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `grants.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log level or filter directive. `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute your tax contribution and its share of grants.
    Calculate {
        /// Annual taxable income, e.g. 53359 or "$53,359".
        #[arg(long, value_parser = parse_amount)]
        income: Decimal,

        /// Annual GST-eligible spending.
        #[arg(long, value_parser = parse_amount)]
        spending: Decimal,

        /// First year you paid taxes.
        #[arg(long, default_value_t = DEFAULT_TAXPAYER_SINCE_YEAR)]
        since: i32,

        /// Leave Global Affairs Canada projects out.
        #[arg(long)]
        no_gac: bool,

        /// Session the calculation is recorded under.
        #[arg(long, default_value = DEFAULT_SESSION_KEY)]
        session: String,

        #[arg(long)]
        json: bool,
    },

    /// Your share of one domestic grant under your latest calculation.
    Share {
        #[arg(long)]
        grant_id: i64,

        #[arg(long, default_value = DEFAULT_SESSION_KEY)]
        session: String,

        #[arg(long)]
        json: bool,
    },

    /// Corpus statistics for domestic grants and GAC projects.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Search domestic grants, or GAC projects with `--gac`.
    Search {
        /// Text matched against titles, recipients and descriptions.
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        province: Option<String>,

        /// Fiscal year, e.g. 2023-24.
        #[arg(long)]
        year: Option<String>,

        #[arg(long, value_parser = parse_amount)]
        min: Option<Decimal>,

        #[arg(long, value_parser = parse_amount)]
        max: Option<Decimal>,

        /// value_desc, value_asc, date_desc, date_asc or title.
        #[arg(long, value_parser = parse_sort, default_value = "value_desc")]
        sort: GrantSort,

        #[arg(long)]
        limit: Option<u32>,

        /// Notable grants only.
        #[arg(long)]
        notable: bool,

        /// Search GAC projects instead of domestic grants.
        #[arg(long)]
        gac: bool,

        /// GAC project status: operational, closed or terminating.
        #[arg(long, value_parser = parse_status, requires = "gac")]
        status: Option<GacStatus>,

        /// Country a GAC project operates in.
        #[arg(long, requires = "gac")]
        country: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

fn parse_sort(s: &str) -> Result<GrantSort, String> {
    GrantSort::parse(s).ok_or_else(|| format!("unknown sort '{s}'"))
}

fn parse_status(s: &str) -> Result<GacStatus, String> {
    GacStatus::parse(s).ok_or_else(|| format!("unknown status '{s}'"))
}

// ─── output ──────────────────────────────────────────────────────────────────

fn emit<T: Serialize>(
    value: &T,
    json: bool,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(DEFAULT_LOG_LEVEL);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let failure = describe_failure(&err);
            if failure.kind == FailureKind::Server {
                error!("{err:#}");
            } else {
                debug!("{err:#}");
            }
            eprintln!("error: {}", failure.message);
            ExitCode::from(failure.kind.exit_code())
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    config.apply_cli(CliOverrides {
        backend: cli.backend,
        connection_string: cli.db,
        log_level: cli.log_level,
        log_file: cli.log_file,
    });

    set_log_level(&config.logging.level).map_err(|e| ConfigError::Logging(e.to_string()))?;
    if let Some(path) = &config.logging.file {
        enable_file_logging(path).map_err(|e| ConfigError::Logging(e.to_string()))?;
    }

    debug!("connecting to {} backend", config.database.backend);
    let registry = app::build_registry();
    let repo = registry
        .create(&config.database)
        .await
        .with_context(|| format!("Failed to open '{}'", config.database.connection_string))?;
    let repo = repo.as_ref();

    match cli.command {
        Command::Calculate {
            income,
            spending,
            since,
            no_gac,
            session,
            json,
        } => {
            let allocation = app::resolve_allocation(repo, &config.allocation).await?;
            let request = CalculationRequest {
                taxpayer_since_year: since,
                include_gac: !no_gac,
                session_key: session,
                ..CalculationRequest::new(income, spending)
            };
            let current_year = chrono::Local::now().year();
            info!(tax_year = allocation.tax_year, current_year, "calculating contribution");

            let report = app::calculate(repo, allocation, &request, current_year).await?;
            emit(&report, json, render::render_report)?;
        }
        Command::Share {
            grant_id,
            session,
            json,
        } => {
            let allocation = app::resolve_allocation(repo, &config.allocation).await?;
            let share = app::grant_share(repo, allocation, grant_id, &session).await?;
            emit(&share, json, render::render_share)?;
        }
        Command::Stats { json } => {
            let stats = app::stats(repo).await?;
            emit(&stats, json, render::render_stats)?;
        }
        Command::Search {
            query,
            province,
            year,
            min,
            max,
            sort,
            limit,
            notable,
            gac,
            status,
            country,
            json,
        } => {
            let query = SearchQuery {
                domestic: GrantFilter {
                    query,
                    province,
                    fiscal_year: year,
                    min_value: min,
                    max_value: max,
                    notable_only: notable,
                    sort,
                    limit,
                    ..GrantFilter::default()
                },
                gac,
                gac_status: status,
                country,
            };
            let results = app::search(repo, &query).await?;
            emit(&results, json, render::render_search)?;
        }
    }

    Ok(())
}
