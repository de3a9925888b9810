//! Batch front end: run the pipeline over one file in a chosen mode.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use nc_language_server::config::{Args, Config};
use nc_language_server::engine::{AxesRotation, MacroMap, UnitConversion};
use nc_language_server::pipeline::{Mode, ModeFlags, Pipeline};
use nc_language_server::settings::ConfigResolver;

#[derive(Debug, Parser)]
#[command(name = "nc-check")]
#[command(about = "Check, annotate or rewrite an NC program")]
#[command(version)]
struct Cli {
    /// Program to process
    file: PathBuf,

    /// Report diagnostics only
    #[arg(long)]
    parse: bool,

    /// Rewrite the program in the other length unit
    #[arg(long, value_enum)]
    convert_length: Option<UnitConversion>,

    /// Print cumulative path and time per line
    #[arg(long)]
    path_time: bool,

    /// Rewrite the program with rotated axes
    #[arg(long, value_enum)]
    rotate_axes: Option<AxesRotation>,

    #[command(flatten)]
    args: Args,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mode = Mode::try_from(ModeFlags {
        parse: cli.parse,
        convert_length: cli.convert_length,
        path_time: cli.path_time,
        rotate_axes: cli.rotate_axes,
    })?;
    let config = Config::from_args(cli.args)?;
    config.init_logging()?;

    let text = fs::read_to_string(&cli.file)
        .with_context(|| format!("cannot read {}", cli.file.display()))?;

    let mut pipeline = Pipeline::new(ConfigResolver::new(config.root.clone(), config.settings_path.clone()));
    let mut macros = MacroMap::new();
    let outcome = pipeline.run(&text, config.dialect, mode, &mut macros);

    for diagnostic in &outcome.diagnostics {
        eprintln!("{}:{}: {}", cli.file.display(), diagnostic.line, diagnostic.message);
    }
    for (key, annotation) in &outcome.path_time {
        println!("{}:{}", key + 1, annotation.trim_end());
    }
    if mode.writes_transcript() {
        print!("{}", outcome.transcript);
    }

    Ok(if outcome.diagnostics.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
