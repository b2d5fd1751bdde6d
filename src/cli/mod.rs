//! コマンドライン定義

pub mod commands;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Jira issue export and lead/cycle time analysis
#[derive(Parser, Debug)]
#[command(name = "jira-flow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = crate::logging::ENV_LOG_LEVEL, global = true)]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every issue matching a JQL query and write them as a JSON array
    Search(commands::search::SearchArgs),

    /// Issue analytics
    Analysis(commands::analysis::AnalysisArgs),
}
