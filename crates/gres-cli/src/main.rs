//! gresctl
//!
//! Command-line interface for inspecting OpenCL device configuration and
//! previewing the environment exported to jobs.

mod commands;

use clap::{Parser, Subcommand};
use gres_core::{GresConfig, LogFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// gresctl - OpenCL generic resource tool
#[derive(Parser, Debug)]
#[command(name = "gresctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured OpenCL devices
    Devices {
        /// Configuration file
        #[arg(long, short)]
        config: PathBuf,
    },

    /// Show OPENCL_VISIBLE_DEVICES for a single-node step allocation
    Env {
        /// Configuration file
        #[arg(long, short)]
        config: PathBuf,

        /// Allocated inventory positions (e.g., 0-1,3)
        #[arg(long)]
        alloc: String,

        /// Usable inventory positions, used with --reset
        #[arg(long)]
        usable: Option<String>,

        /// Restrict the allocation to the usable positions
        #[arg(long)]
        reset: bool,

        /// Value already exported earlier in the session
        #[arg(long)]
        seen: Option<String>,
    },

    /// Write the device inventory to a file for a step launcher
    Send {
        /// Configuration file
        #[arg(long, short)]
        config: PathBuf,

        /// Output file
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Read a device inventory written by `send`
    Recv {
        /// Input file
        #[arg(long, short)]
        input: PathBuf,
    },
}

impl Commands {
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Devices { config }
            | Commands::Env { config, .. }
            | Commands::Send { config, .. } => Some(config),
            Commands::Recv { .. } => None,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Level and format: `-v` wins, then `--log-level`, then the config file
fn logging_settings(cli: &Cli, config: Option<&GresConfig>) -> (Level, LogFormat) {
    let level = if cli.verbose {
        Level::DEBUG
    } else if let Some(level) = &cli.log_level {
        parse_level(level)
    } else if let Some(config) = config {
        parse_level(&config.logging.level)
    } else {
        Level::WARN
    };

    let format = config.map(|c| c.logging.format).unwrap_or_default();
    (level, format)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.command.config_path() {
        Some(path) => Some(commands::load_config(path)?),
        None => None,
    };

    // Initialize logging
    let (log_level, log_format) = logging_settings(&cli, config.as_ref());
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
    };

    let mut out = std::io::stdout().lock();

    match (cli.command, config) {
        (Commands::Devices { .. }, Some(config)) => {
            commands::devices(&config, &mut out)?;
        }
        (
            Commands::Env {
                alloc,
                usable,
                reset,
                seen,
                ..
            },
            Some(config),
        ) => {
            let request = commands::EnvRequest {
                alloc,
                usable,
                reset,
                seen,
            };
            commands::env(&config, &request, &mut out)?;
        }
        (Commands::Send { output, .. }, Some(config)) => {
            commands::send(&config, &output, &mut out)?;
        }
        (Commands::Recv { input }, _) => {
            commands::recv(&input, &mut out)?;
        }
        (_, None) => anyhow::bail!("a configuration file is required"),
    }

    Ok(())
}
