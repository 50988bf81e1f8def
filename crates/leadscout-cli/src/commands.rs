//! Command handlers for the CLI.
//!
//! Each handler builds the pipeline services from config, does one unit of
//! work and prints a short summary. Errors propagate to `main`.

use std::path::Path;

use chrono::Utc;
use leadscout_core::{AppConfig, JobTemplate, Pagination};
use leadscout_pipeline::{
    Dispatcher, JobOutcome, Orchestrator, PgStore, QueueRunner, RunOutcome, Services, VerifyPolicy,
};
use leadscout_scraper::AreaCodeTable;

fn build_orchestrator(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<Orchestrator> {
    let area_codes = AreaCodeTable::load_or_empty(&config.area_codes_path);
    let services = Services::from_config(config, PgStore::new(pool.clone()), area_codes)?;
    Ok(Orchestrator::new(
        services,
        VerifyPolicy::from_app_config(config),
    ))
}

/// Parse a job template file.
pub(crate) fn load_job_template(path: &Path) -> anyhow::Result<JobTemplate> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("invalid job template {}: {e}", path.display()))
}

pub(crate) fn describe_plan(template: &JobTemplate, pagination: Pagination) -> String {
    let offsets: Vec<String> = pagination.offsets().iter().map(u64::to_string).collect();
    format!(
        "{} ({}), {} page(s) of {} at skip [{}]",
        template.filters.describe(),
        template.phone_mode.as_str(),
        pagination.page_count,
        pagination.page_size,
        offsets.join(", ")
    )
}

/// Run one scrape from `job_path`.
///
/// Dates missing from both template and settings default to today in the
/// configured zone, as a scheduled run would.
///
/// # Errors
///
/// Returns an error if the template cannot be read, settings cannot be loaded,
/// no source key is configured, or the fetch fails.
pub(crate) async fn run_job(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    job_path: &Path,
    pagination: Pagination,
    dry_run: bool,
) -> anyhow::Result<()> {
    let template = load_job_template(job_path)?;
    if pagination.page_size == 0 || pagination.page_count == 0 {
        anyhow::bail!("--limit and --pages must be positive");
    }

    if dry_run {
        println!("dry-run: would scrape {}", describe_plan(&template, pagination));
        return Ok(());
    }

    let orchestrator = build_orchestrator(pool, config)?;
    let settings = orchestrator.services().settings.load_settings().await?;
    let today = Utc::now()
        .with_timezone(&config.default_time_zone)
        .date_naive();
    let spec = leadscout_pipeline::resolve_job(&template, &settings, pagination, Some(today))?;

    match orchestrator.run(&spec).await? {
        RunOutcome::Completed(report) => {
            println!(
                "completed: {} records, {} rows, {} verified, {} uploaded",
                report.tally.found, report.tally.rows, report.tally.verified, report.tally.uploaded
            );
            for warning in &report.warnings {
                println!("  warning [{}]: {}", warning.stage, warning.message);
            }
        }
        RunOutcome::NoData => println!("no data found for {}", template.filters.describe()),
    }
    Ok(())
}

/// Fire every schedule due this minute.
///
/// # Errors
///
/// Returns an error if settings or schedules cannot be loaded.
pub(crate) async fn run_tick(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(build_orchestrator(pool, config)?, config.default_time_zone);
    let report = dispatcher.run_tick(Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Process up to `max_jobs` pending jobs, stopping early when the queue is empty.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or a job transition fails.
pub(crate) async fn process_queue(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    max_jobs: u32,
) -> anyhow::Result<()> {
    let runner = QueueRunner::new(
        build_orchestrator(pool, config)?,
        chrono::Duration::minutes(config.stale_job_minutes),
    );

    let mut processed = 0u32;
    while processed < max_jobs {
        let pass = runner.process_next_job(Utc::now()).await?;
        let Some(outcome) = pass.outcome else {
            break;
        };
        processed += 1;
        match &outcome {
            JobOutcome::Failed { job_id, error } => {
                tracing::warn!(job_id, error = %error, "queued job failed");
            }
            JobOutcome::Completed { .. } | JobOutcome::NoData { .. } => {}
        }
        println!("{}", serde_json::to_string(&outcome)?);
    }

    println!("processed {processed} job(s)");
    Ok(())
}

/// Re-verify the oldest unverified snapshot.
///
/// # Errors
///
/// Returns an error if no verifier key is configured or the snapshot cannot be
/// read or written.
pub(crate) async fn reverify(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(pool, config)?;
    match leadscout_pipeline::reverify_next_snapshot(
        orchestrator.services(),
        orchestrator.verify_policy(),
    )
    .await?
    {
        Some(report) => println!(
            "snapshot {}: {} valid of {} rows{}",
            report.snapshot_id,
            report.valid,
            report.rows,
            if report.stopped_early {
                " (stopped at deadline)"
            } else {
                ""
            }
        ),
        None => println!("no unverified snapshots"),
    }
    Ok(())
}
