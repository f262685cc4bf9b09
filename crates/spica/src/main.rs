use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use spica_core::config::PipelineConfig;
use spica_core::pipeline::PipelineRunner;
use spica_core::targets::default_target_descriptors;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Successful runs print nothing; archive chatter stays quiet even on warn.
const DEFAULT_LOG_FILTER: &str = "warn,spica_core::archive=error";

#[derive(Parser, Debug)]
#[command(author, version, about = "K2 pixel-data lightcurve plots for Spica", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, clean and plot every configured target (the default)
    Run(RunArgs),
    /// List the configured targets
    Targets(ConfigArgs),
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// TOML file overriding the built-in configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Directory for the rendered PNG files
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Read pixel files from this directory instead of MAST
    #[arg(long)]
    archive_dir: Option<PathBuf>,
    /// Where MAST downloads are cached
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Run the systematics-correction stage
    #[arg(long)]
    enable_correction: bool,
    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => run(args),
        Command::Targets(args) => list_targets(&load_config(&args)?),
    }
}

fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = args.archive_dir {
        config.archive.local_dir = Some(dir);
    }
    if let Some(dir) = args.cache_dir {
        config.archive.cache_dir = dir;
    }
    if args.enable_correction {
        config.correction.enabled = true;
    }

    let runner = PipelineRunner::from_config(config).context("failed to set up pipeline")?;
    let summary = runner.run().context("pipeline run failed")?;
    info!(
        targets = summary.targets.len(),
        artifacts = summary.artifacts().count(),
        "pipeline finished"
    );

    if args.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn list_targets(config: &PipelineConfig) -> Result<()> {
    for target in &config.targets {
        let name = default_target_descriptors()
            .iter()
            .find(|d| d.target.epic_id == target.epic_id && d.target.campaign == target.campaign)
            .map(|d| d.common_name)
            .unwrap_or("-");
        println!(
            "{}\tEPIC {}\tcampaign {}\t{}",
            target.label(),
            target.epic_id,
            target.campaign,
            name
        );
    }
    Ok(())
}
