use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};

use extratod::config::Config;
use extratod::extrato::{should_run_monthly_extrato, Dispatcher, LedgerGenerator, RunLog};
use extratod::storage;

#[derive(Parser)]
#[command(
    name = "extratod",
    about = "Monthly statement (extrato) generation service for studio bookkeeping",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (overrides EXTRATOD_CONFIG)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + check loop)
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Trigger this month's statement generation, synchronously
    Run {
        /// Generate even if the guard says the month is covered
        #[arg(long)]
        force: bool,
    },

    /// Show recent generation attempts from the run log
    History {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Print a generated statement
    Show {
        #[arg(long)]
        month: u32,

        #[arg(long)]
        year: i32,
    },
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(p) => Config::load(Path::new(p)),
        None => Ok(Config::load_or_default()),
    }
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            tracing::info!(%bind, "Starting extratod daemon");
            extratod::serve(&bind, config).await?;
        }
        Commands::Run { force } => {
            let pool = storage::open_pool(&config.storage.db_path)?;
            let run_log = RunLog::new(pool.clone());

            let now = Utc::now();
            if !force
                && !should_run_monthly_extrato(now, &run_log, config.extrato.min_day_of_month)
            {
                println!(
                    "Extrato for {}/{} is not due (already generated, or too early in the month).",
                    now.month(),
                    now.year()
                );
                println!("Use --force to regenerate.");
                return Ok(());
            }

            let generator = Arc::new(LedgerGenerator::new(pool, run_log.clone()));
            // CLI runs are always synchronous: the process exits right after.
            let dispatcher = Dispatcher::new(generator, config.extrato.max_concurrent_runs, true);
            dispatcher.dispatch_sync(now.month(), now.year()).await;

            match run_log.find_success(now.month(), now.year())? {
                Some(entry) => println!(
                    "Generated extrato for {}/{}: {}",
                    now.month(),
                    now.year(),
                    entry.message.unwrap_or_default()
                ),
                None => println!(
                    "Generation for {}/{} did not succeed; see logs and `extratod history`.",
                    now.month(),
                    now.year()
                ),
            }
        }
        Commands::History { limit } => {
            let pool = storage::open_pool(&config.storage.db_path)?;
            let run_log = RunLog::new(pool);

            let entries = run_log.recent(limit)?;
            if entries.is_empty() {
                println!("No generation attempts recorded.");
            } else {
                println!("{:<12} | {:<8} | {:<25} | Message", "Month", "Status", "Recorded at");
                println!("{:-<12}-|-{:-<8}-|-{:-<25}-|-{:-<30}", "", "", "", "");
                for e in entries {
                    println!(
                        "{:<12} | {:<8} | {:<25} | {}",
                        format!("{}/{}", e.month, e.year),
                        e.status.to_string(),
                        e.recorded_at.to_rfc3339(),
                        e.message.unwrap_or_default()
                    );
                }
            }
        }
        Commands::Show { month, year } => {
            let pool = storage::open_pool(&config.storage.db_path)?;

            match storage::find_extrato(&pool, month, year)? {
                Some(e) => {
                    println!("\nExtrato {}/{}", e.month, e.year);
                    println!("{:<15} : {:>12}", "Revenue", format_cents(e.revenue_cents));
                    println!("{:<15} : {:>12}", "Commissions", format_cents(e.commissions_cents));
                    println!("{:<15} : {:>12}", "Expenses", format_cents(e.expenses_cents));
                    println!("{:<15} : {:>12}", "Net", format_cents(e.net_cents));
                    println!("Generated at {}\n", e.generated_at.to_rfc3339());
                }
                None => println!("No extrato generated for {}/{}.", month, year),
            }
        }
    }

    Ok(())
}
