//! Trellis CLI - Command line interface for the graph identity core

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod layout;
mod output;

use commands::{build, completions, config as config_cmd, id};
use config::Config;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(author, version, about = "Identity and composition core for in-memory graphs")]
pub struct Cli {
    /// Config file
    #[arg(short = 'c', long = "config", env = "TRELLIS_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Output format: text, json, pretty (overrides config)
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(config::default_config_path)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate and inspect identifiers
    Id(id::IdArgs),
    /// Build a graph from a layout file
    Build(build::BuildArgs),
    /// Manage configuration
    Config(config_cmd::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context shared by commands
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli.config_path();
        let config = Config::load(&config_path)?;
        let format = match &cli.format {
            Some(name) => OutputFormat::parse(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown output format '{}', expected one of: {}",
                    name,
                    OutputFormat::NAMES.join(", ")
                )
            })?,
            None => config.output_format(),
        };
        Ok(Self {
            config,
            config_path,
            format,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = AppContext::new(&cli)?;

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error".to_string(),
        0 => ctx.config.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting trellis CLI");

    match &cli.command {
        Commands::Id(args) => id::run(args, &ctx)?,
        Commands::Build(args) => build::run(args, &ctx)?,
        Commands::Config(args) => config_cmd::run(args, &ctx)?,
        Commands::Completions(args) => completions::run(args)?,
    }

    Ok(())
}
