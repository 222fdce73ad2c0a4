//! uspy-harvest main entry point
//!
//! This is the command-line interface for the JupiterWeb catalog harvester.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;
use uspy_harvest::config::{load_config_with_hash, Config};
use uspy_harvest::harvest::FanOutLimits;
use uspy_harvest::offerings::SubjectKey;
use uspy_harvest::output::{
    generate_markdown_summary, load_statistics, print_statistics, print_summary, HarvestSummary,
};
use uspy_harvest::storage::{open_storage, publish_catalog, RunStatus, RunTotals, Storage};
use uspy_harvest::url::course_listing_url;
use uspy_harvest::{aggregate_offerings, FetchUnit, Harvester};

/// uspy-harvest: a concurrent catalog harvester for JupiterWeb
///
/// Harvests the courses and subjects of an institute, publishes them as
/// documents to a SQLite database, and reports what was collected and
/// what was dropped.
#[derive(Parser, Debug)]
#[command(name = "uspy-harvest")]
#[command(version)]
#[command(about = "A concurrent catalog harvester for JupiterWeb", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested
    #[arg(long, conflicts_with_all = ["stats", "course", "departments", "offerings"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["course", "departments", "offerings"])]
    stats: bool,

    /// Harvest a single course page and print it as JSON
    #[arg(long, value_name = "URL", conflicts_with_all = ["departments", "offerings"])]
    course: Option<String>,

    /// List the professors of the configured departments as JSON
    #[arg(long, conflicts_with = "offerings")]
    departments: bool,

    /// Print the ranked offerings of a subject as JSON
    #[arg(long, value_name = "SUBJECT", requires = "course_code")]
    offerings: Option<String>,

    /// Course code of the subject given to --offerings
    #[arg(long, value_name = "CODE")]
    course_code: Option<String>,

    /// Specialization of the subject given to --offerings
    #[arg(long, value_name = "CODE")]
    specialization: Option<String>,

    /// Maximum number of offerings to print
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(url) = &cli.course {
        handle_course(&config, url, cancel).await?;
    } else if cli.departments {
        handle_departments(&config, cancel).await?;
    } else if let (Some(subject), Some(course_code)) = (&cli.offerings, &cli.course_code) {
        let key = SubjectKey::new(subject, course_code, cli.specialization.clone());
        handle_offerings(&config, &key, cli.limit, cancel).await?;
    } else {
        handle_harvest(&config, &config_hash, cancel).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("uspy_harvest=info,warn"),
            1 => EnvFilter::new("uspy_harvest=debug,info"),
            2 => EnvFilter::new("uspy_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancels the token on Ctrl-C so in-flight requests are aborted
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling harvest");
            cancel.cancel();
        }
    });
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== uspy-harvest Dry Run ===\n");

    println!("Harvester Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.harvester.max_concurrent_fetches
    );
    println!(
        "  Request timeout: {}s (connect {}s)",
        config.harvester.request_timeout_secs, config.harvester.connect_timeout_secs
    );
    println!(
        "  Retries: {} (backoff {}ms)",
        config.harvester.max_retries, config.harvester.retry_backoff_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSource:");
    println!("  Course listing: {}", course_listing_url(&config.source)?);
    println!("  Professors: {}", config.source.professors_url);
    println!("  Departments: {}", config.source.departments.join(", "));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --course mode: harvests one course page
async fn handle_course(config: &Config, url: &str, cancel: CancellationToken) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("invalid course URL: {}", url))?;
    let harvester = Harvester::new(config, cancel)?;

    let harvest = harvester.harvest_course(&FetchUnit::new(url, "course")).await?;
    tracing::info!(
        "Collected {} of {} subjects ({} dropped)",
        harvest.collected(),
        harvest.expected,
        harvest.dropped_count()
    );

    println!("{}", serde_json::to_string_pretty(&harvest.course)?);
    Ok(())
}

/// Handles the --departments mode: lists professors per department
async fn handle_departments(config: &Config, cancel: CancellationToken) -> Result<()> {
    let harvester = Harvester::new(config, cancel)?;
    let listing = harvester.scrape_departments().await?;

    for failure in &listing.failures {
        tracing::warn!("Department failed: {}", failure);
    }

    println!("{}", serde_json::to_string_pretty(&listing.professors)?);
    Ok(())
}

/// Handles the --offerings mode: ranks the offerings of a subject
async fn handle_offerings(
    config: &Config,
    key: &SubjectKey,
    limit: Option<usize>,
    cancel: CancellationToken,
) -> Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let report = aggregate_offerings(
        Arc::new(Mutex::new(storage)),
        key,
        limit,
        FanOutLimits::from(&config.harvester),
        &cancel,
    )
    .await?;

    for failure in &report.dropped {
        tracing::warn!("Offering dropped: {}", failure);
    }

    println!("{}", serde_json::to_string_pretty(&report.offerings)?);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str, cancel: CancellationToken) -> Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let run_id = storage.create_run(config_hash)?;
    tracing::info!("Starting harvest run {}", run_id);

    let harvester = Harvester::new(config, cancel.clone())?;
    let harvest = match harvester.harvest_institute().await {
        Ok(harvest) => harvest,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            storage.complete_run(run_id, RunStatus::Failed, RunTotals::default())?;
            return Err(e.into());
        }
    };

    let courses: Vec<_> = harvest.courses.iter().map(|c| c.course.clone()).collect();
    let published = publish_catalog(&courses, &mut storage);

    let status = if cancel.is_cancelled() {
        RunStatus::Interrupted
    } else {
        RunStatus::Completed
    };
    let totals = RunTotals {
        expected: harvest.expected_units() as u64,
        collected: harvest.collected_units() as u64,
        dropped: harvest.dropped_units() as u64,
    };
    storage.complete_run(run_id, status, totals)?;

    let run = storage.get_run(run_id)?;
    let summary = HarvestSummary::from_harvest(&harvest)
        .with_run(&run)
        .with_publish(&published);

    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;
    print_summary(&summary);
    println!("\n✓ Summary written to: {}", config.output.summary_path);

    Ok(())
}
