//! bundle-size CLI - Measure fixture bundle sizes and compare reports

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

mod alert;
mod build;
mod config;
mod error;
mod file_manager;
mod prepare;
mod validation;

use alert::AlertConfig;
use build::{build_fixtures, BuildEngine, CommandBuildEngine};
use bundle_size_core::reporter::{render_cli_table, render_json, render_markdown};
use bundle_size_core::{changed_only, classify_reports, compare_reports, removed_fixtures, Report};
use config::ProjectConfig;

/// bundle-size: Track the bundle size of library fixtures
#[derive(Parser, Debug)]
#[command(name = "bundle-size")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every fixture and write a size report
    Measure(MeasureArgs),
    /// Compare a current report against a baseline
    Compare(CompareArgs),
}

#[derive(Parser, Debug)]
struct MeasureArgs {
    /// Directory fixtures are discovered from
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Glob for fixture files, relative to the root
    #[arg(long, default_value = file_manager::DEFAULT_FIXTURE_PATTERN)]
    pattern: String,

    /// Where prepared fixtures and bundles are written, relative to the root
    #[arg(long, default_value = "dist/bundle-size")]
    out_dir: PathBuf,

    /// Report file name, relative to the output directory
    #[arg(long, default_value = "bundle-size.json")]
    report_file: PathBuf,

    /// Explicit config file instead of searching from the root
    #[arg(long, env = "BUNDLE_SIZE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Cli,
    Markdown,
    Json,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    #[arg(long, value_name = "FILE")]
    baseline: PathBuf,

    #[arg(long, value_name = "FILE")]
    current: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Cli)]
    format: OutputFormat,

    /// Fail when a fixture's minified size grows by more than this, e.g. "5%"
    #[arg(long)]
    fail_threshold: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Measure(args) => measure_command(args).await,
        Commands::Compare(args) => compare_command(args),
    }
}

async fn measure_command(args: MeasureArgs) -> Result<()> {
    validation::validate_dir_exists(&args.root, "Fixture root")?;
    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root directory: {:?}", args.root))?;

    let project_config = match &args.config {
        Some(path) => {
            validation::validate_file_exists(path, "Config file")?;
            ProjectConfig::load(path)
        }
        None => ProjectConfig::discover(&root),
    }
    .with_context(|| "Failed to load bundle-size configuration")?;

    let out_dir = root.join(&args.out_dir);
    let report_path = out_dir.join(&args.report_file);

    file_manager::clear_output_dir(&out_dir, &root)
        .with_context(|| format!("Failed to clear output directory: {:?}", out_dir))?;

    let fixtures = file_manager::discover_fixtures(&root, &args.pattern)?;
    info!("Found {} fixture(s) matching '{}'", fixtures.len(), args.pattern);

    let prepared = prepare::prepare_fixtures(&root, &fixtures, &out_dir).await?;
    debug!("Prepared {} fixture(s) in {:?}", prepared.len(), out_dir);

    let concurrency = project_config.concurrency();
    info!("Building fixtures ({} at a time)", concurrency);
    let engine: Arc<dyn BuildEngine> = Arc::new(CommandBuildEngine);
    let records = build_fixtures(
        engine,
        prepared,
        project_config.bundler_transform(),
        concurrency,
    )
    .await?;

    let report = Report::new(records).with_context(|| "Failed to assemble size report")?;
    save_report(&report, &report_path)?;

    info!("Saved size report for {} fixture(s) to {:?}", report.len(), report_path);

    Ok(())
}

fn save_report(report: &Report, path: &Path) -> Result<()> {
    report
        .save_to_file(path)
        .with_context(|| format!("Failed to save size report: {:?}", path))
}

fn compare_command(args: CompareArgs) -> Result<()> {
    validation::validate_file_exists(&args.baseline, "Baseline report")?;
    validation::validate_file_exists(&args.current, "Current report")?;

    let alert_config = AlertConfig {
        fail_threshold: args
            .fail_threshold
            .as_deref()
            .map(validation::parse_threshold)
            .transpose()
            .with_context(|| "Invalid threshold configuration")?,
    };

    let baseline = Report::load_from_file(&args.baseline)
        .with_context(|| "Failed to load baseline report")?;
    let current = Report::load_from_file(&args.current)
        .with_context(|| "Failed to load current report")?;

    let compared = compare_reports(&baseline, &current);
    let changes = changed_only(&compared);
    let removed = removed_fixtures(&baseline, &current);

    for (path, kind) in classify_reports(&baseline, &current) {
        debug!("{}: {:?}", path, kind);
    }

    match args.format {
        OutputFormat::Json => println!("{}", render_json(&changes, &removed)?),
        OutputFormat::Markdown => println!("{}", render_markdown(&changes, &removed)),
        OutputFormat::Cli => println!("{}", render_cli_table(&changes)),
    }

    if alert::is_github_actions() {
        debug!("Running in GitHub Actions environment");
        print!("{}", alert::format_github_actions_alert(&changes, &alert_config));
    }

    if alert::should_fail(&changes, &alert_config) {
        error!("Bundle size threshold exceeded - failing");
        std::process::exit(1);
    }

    Ok(())
}
