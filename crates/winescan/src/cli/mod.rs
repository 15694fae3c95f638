//! Command-line interface for winescan.
//!
//! This module provides the CLI structure for the `winescan` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CatalogCommand, ConfigCommand, DevicesCommand, HistoryCommand, ScanCommand, WatchCommand,
};

/// winescan - Look up wines from scanned QR codes
///
/// Resolves decoded QR payloads against a wine catalog, shows the match,
/// and keeps a history of every scan that can be exported as CSV.
#[derive(Debug, Parser)]
#[command(name = "winescan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve one payload, show it, and log it
    Scan(ScanCommand),

    /// Resolve decoded payloads as they arrive, one per line
    Watch(WatchCommand),

    /// List scan devices
    Devices(DevicesCommand),

    /// Inspect the wine catalog
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// View, export or clear scan history
    #[command(subcommand)]
    History(HistoryCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "winescan");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["winescan", "-q", "devices"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["winescan", "devices"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["winescan", "-v", "devices"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["winescan", "-vv", "devices"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_scan() {
        let cli = parse(&["winescan", "scan", "wine:MERLOT_2019", "--json"]);
        match cli.command {
            Command::Scan(cmd) => {
                assert_eq!(cmd.payload, "wine:MERLOT_2019");
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_watch_with_input() {
        let cli = parse(&["winescan", "watch", "--input", "codes.txt", "-d", "codes.txt"]);
        match cli.command {
            Command::Watch(cmd) => {
                assert_eq!(cmd.input, Some(PathBuf::from("codes.txt")));
                assert_eq!(cmd.device.as_deref(), Some("codes.txt"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_history_export() {
        let cli = parse(&["winescan", "history", "export", "-o", "-"]);
        assert!(matches!(
            cli.command,
            Command::History(HistoryCommand::Export { output: Some(_) })
        ));
    }

    #[test]
    fn test_parse_history_clear_requires_nothing() {
        let cli = parse(&["winescan", "history", "clear"]);
        assert!(matches!(
            cli.command,
            Command::History(HistoryCommand::Clear { yes: false })
        ));
    }

    #[test]
    fn test_parse_catalog_get() {
        let cli = parse(&["winescan", "catalog", "get", "ABC"]);
        assert!(matches!(cli.command, Command::Catalog(CatalogCommand::Get { .. })));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["winescan", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_scan_requires_payload() {
        assert!(Cli::try_parse_from(["winescan", "scan"]).is_err());
    }
}
