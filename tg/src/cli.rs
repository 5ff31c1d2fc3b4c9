//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// taskgate - typed task admission scheduler
#[derive(Parser)]
#[command(
    name = "tg",
    about = "Queue kai and kantra tasks and run them within per-type concurrency limits",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive console: submit, list, and cancel tasks (default)
    Console,

    /// Submit a batch of tasks and wait until all of them finish
    Run {
        /// Number of kai tasks to submit
        #[arg(long, default_value_t = 0)]
        kai: usize,

        /// Number of kantra tasks to submit
        #[arg(long, default_value_t = 0)]
        kantra: usize,

        /// Output format for the final summary
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskgate")
        .join("logs")
        .join("taskgate.log")
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}

/// Output format for the run summary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format '{}'. Use: text, json", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["tg", "run", "--kai", "3", "--kantra", "1", "-f", "json"]).unwrap();
        match cli.command {
            Some(Command::Run { kai, kantra, format }) => {
                assert_eq!(kai, 3);
                assert_eq!(kantra, 1);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("Expected Run, got {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_means_console() {
        let cli = Cli::try_parse_from(["tg", "--log-level", "debug"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_output_format_rejects_unknown() {
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
    }
}
