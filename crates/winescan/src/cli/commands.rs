//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Payload to resolve, as decoded from a code or typed by hand
    pub payload: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Read decoded payloads from this file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Device to scan with
    #[arg(short, long)]
    pub device: Option<String>,

    /// Output each resolution as a JSON line
    #[arg(short, long)]
    pub json: bool,
}

/// Devices command arguments.
#[derive(Debug, Args)]
pub struct DevicesCommand {
    /// List devices for this input file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

/// Catalog commands.
#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List all catalog entries in order
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one entry by its identifier
    Get {
        /// Catalog identifier
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// History commands.
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Show scan history, most recent first
    List {
        /// Maximum number of events to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Export scan history as CSV
    Export {
        /// Output file, `-` for stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Remove all scan history
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show history statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_command_debug() {
        let cmd = ScanCommand {
            payload: "wine:ABC".to_string(),
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("wine:ABC"));
    }

    #[test]
    fn test_history_command_debug() {
        let cmd = HistoryCommand::Clear { yes: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Clear"));
        assert!(debug_str.contains("yes"));
    }

    #[test]
    fn test_catalog_command_debug() {
        let cmd = CatalogCommand::Get {
            id: "ABC".to_string(),
            json: true,
        };
        assert!(format!("{cmd:?}").contains("ABC"));
    }
}
