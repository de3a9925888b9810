//! Configuration management for the NC language server.
//!
//! Handles:
//! - Command-line argument parsing
//! - Default configuration root
//! - Logger setup

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::settings::Dialect;

/// Command-line arguments shared by the server and the batch checker
#[derive(Debug, Parser)]
#[command(name = "nc-ls")]
#[command(about = "Language server for NC machine-tool programs")]
#[command(version)]
pub struct Args {
    /// Directory holding `conf/<dialect>/` tables
    #[arg(long, help = "Configuration root containing conf/<dialect>/")]
    pub root: Option<PathBuf>,

    /// Dialect used when the machine settings do not name one
    #[arg(long, help = "Control dialect (e.g. 'fanuc_mill', 'heidenhain')")]
    pub dialect: Option<String>,

    /// Machine settings file
    #[arg(long, help = "Machine settings (.ncsetting) TOML file")]
    pub settings: Option<PathBuf>,

    /// Show path/time annotations as inlay hints
    #[arg(long)]
    pub annotate_path_time: bool,

    /// Log level for the language server
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    /// Append log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub dialect: Dialect,
    pub settings_path: Option<PathBuf>,
    pub annotate_path_time: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            dialect: Dialect::default(),
            settings_path: None,
            annotate_path_time: false,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let dialect = match args.dialect.as_deref() {
            Some(name) => name.parse()?,
            None => Dialect::default(),
        };

        Ok(Config {
            root: args.root.unwrap_or_else(default_root),
            dialect,
            settings_path: args.settings,
            annotate_path_time: args.annotate_path_time,
            log_level: args.log_level,
            log_file: args.log_file,
        })
    }

    /// Install the global logger. `RUST_LOG` overrides `--log-level`.
    pub fn init_logging(&self) -> Result<()> {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        let mut builder = env_logger::Builder::from_env(env);
        builder.format_timestamp_millis();

        if let Some(path) = &self.log_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        builder.try_init().context("logger already initialized")?;
        Ok(())
    }
}

/// `<config dir>/nc-ls`, or the working directory without one.
pub fn default_root() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("nc-ls"))
        .unwrap_or_else(|| PathBuf::from("."))
}
