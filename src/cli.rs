//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for shorturl using clap's derive macros.

use clap::{Parser, Subcommand};

/// shorturl - short identifier generation and storage engine
#[derive(Parser, Debug)]
#[command(name = "shorturl")]
#[command(version)]
#[command(about = "Short identifier generation and storage for URLs", long_about = None)]
pub struct Cli {
    /// Configuration file (default: config.toml, optional)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Owner identity that scopes creation, listing and deletion
    #[arg(long, short = 'o', global = true)]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shorten one or more URLs
    ///
    /// Without --owner the URLs are shortened anonymously.
    Create {
        #[arg(required = true, num_args = 1..)]
        urls: Vec<String>,
    },

    /// Shorten every URL listed in a file (one per line) for --owner
    BatchCreate {
        file_path: String,
    },

    /// Show the record behind a short identifier
    Get {
        short_identifier: String,
    },

    /// Resolve a short identifier to its URL (deleted links are reported as gone)
    Resolve {
        short_identifier: String,
    },

    /// Find the short link of a URL for --owner
    FindUrl {
        url: String,
    },

    /// List the links of --owner
    List,

    /// Soft-delete short links owned by --owner
    Delete {
        #[arg(required = true, num_args = 1..)]
        short_identifiers: Vec<String>,
    },

    /// Write a snapshot of every record (default: storage.file_storage_path)
    Backup {
        file_path: Option<String>,
    },

    /// Load records from a snapshot (default: storage.file_storage_path)
    Restore {
        file_path: Option<String>,
    },

    /// Check that the storage backend is reachable
    Ping,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },
}
