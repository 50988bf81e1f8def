mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "leadscout-cli")]
#[command(about = "Run business-listing scrapes and drive the schedule dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one scrape from a job template file.
    Run {
        /// JSON job template.
        #[arg(long)]
        job: PathBuf,
        /// Records per page.
        #[arg(long, default_value_t = 100)]
        limit: u32,
        /// Number of pages to fetch.
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Zero-based page to start from.
        #[arg(long, default_value_t = 0)]
        start_page: u32,
        /// Print the resolved plan without calling any API.
        #[arg(long)]
        dry_run: bool,
    },
    /// Fire every schedule due this minute.
    Tick,
    /// Process pending one-time jobs.
    ProcessQueue {
        /// Stop after this many jobs.
        #[arg(long, default_value_t = 1)]
        max_jobs: u32,
    },
    /// Re-verify the oldest unverified snapshot.
    Reverify,
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("leadscout-cli: no command given; see --help");
        return Ok(());
    };

    let config = leadscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = leadscout_db::PoolConfig::from_app_config(&config);
    let pool = leadscout_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Run {
            job,
            limit,
            pages,
            start_page,
            dry_run,
        } => {
            let pagination = leadscout_core::Pagination {
                page_size: limit,
                page_count: pages,
                start_page,
            };
            commands::run_job(&pool, &config, &job, pagination, dry_run).await
        }
        Commands::Tick => commands::run_tick(&pool, &config).await,
        Commands::ProcessQueue { max_jobs } => {
            commands::process_queue(&pool, &config, max_jobs).await
        }
        Commands::Reverify => commands::reverify(&pool, &config).await,
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            leadscout_db::health_check(&pool).await?;
            println!("database reachable");
            Ok(())
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = leadscout_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
