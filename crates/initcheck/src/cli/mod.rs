/// Command-line interface module for the initcheck binary.
pub mod commands;
use clap::{Parser, Subcommand, ValueEnum};

/// CLI configuration structure.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Wait for the release's init jobs to run to completion
    Check,

    /// Print the current status of the release's init jobs without waiting
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}

/// Output formats for the status command.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Parses command-line arguments into the Cli structure.
///
/// # Returns
/// * `Cli` - Parsed CLI configuration
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["initcheck", "check"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_parse_check_with_config() {
        let cli = Cli::try_parse_from(["initcheck", "check", "--config", "/etc/initcheck.toml"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/initcheck.toml"));
    }

    #[test]
    fn test_parse_status_output_format() {
        let cli = Cli::try_parse_from(["initcheck", "status", "--output", "json"]).unwrap();
        match cli.command {
            Commands::Status { output } => assert_eq!(output, OutputFormat::Json),
            _ => panic!("expected status command"),
        }

        let cli = Cli::try_parse_from(["initcheck", "status"]).unwrap();
        match cli.command {
            Commands::Status { output } => assert_eq!(output, OutputFormat::Text),
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["initcheck", "frobnicate"]).is_err());
    }
}
