//! CLI argument definitions for `csvdv`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "csvdv",
    version,
    about = "Typed CSV ingestion with per-column default values",
    long_about = "Parse CSV files into typed records described by a JSON task file.\n\n\
                  Fields that fail to parse can fall back to a configured default value;\n\
                  records that still cannot be read are skipped with a warning."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse CSV files and write typed records to stdout.
    Run(RunArgs),

    /// Validate a task file without reading any data.
    Check(CheckArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// JSON task file describing columns and parser options.
    #[arg(long = "config", short = 'c', value_name = "TASK")]
    pub config: PathBuf,

    /// Output encoding for committed records.
    #[arg(long = "output", value_enum, default_value = "jsonl")]
    pub output: OutputFormatArg,

    /// Do not print the run summary table.
    #[arg(long = "no-summary")]
    pub no_summary: bool,

    /// Input CSV files, read in order.
    #[arg(value_name = "FILES", required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// JSON task file to validate.
    #[arg(long = "config", short = 'c', value_name = "TASK")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Jsonl,
    Csv,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
