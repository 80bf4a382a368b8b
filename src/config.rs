use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// How result rows are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Values joined by the separator, one row per line.
    #[default]
    List,
    /// One JSON array per row.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Query a SQLite database file without SQLite.
#[derive(Debug, Parser)]
#[command(name = "litescan", version, about)]
pub struct Cli {
    /// Path to the database file.
    pub database: PathBuf,

    /// `.dbinfo`, `.tables` or a SELECT statement. Starts an interactive
    /// prompt when omitted.
    pub command: Option<String>,

    /// Column separator for list output.
    #[arg(long, default_value = "|")]
    pub separator: String,

    #[arg(long, value_enum, default_value_t = OutputMode::List)]
    pub output: OutputMode,

    /// Format of diagnostics on stderr. Verbosity follows RUST_LOG.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}
