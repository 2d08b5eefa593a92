//! CLI interface for the course catalog assistant
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Course catalog assistant
///
/// Answers questions about the course schedule by letting a language model
/// query a vector store of course sections.
#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask questions about the course schedule (type `q` to quit)
    Chat,

    /// Load the schedule CSV into the vector store
    Ingest {
        /// Schedule CSV (defaults to `ingest.csv_path` from the config)
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,

        /// Delete and recreate the collections before loading
        #[arg(long)]
        reset: bool,
    },

    /// Show recent chat sessions
    History {
        /// Number of sessions to show (default: 10)
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Check configuration, store reachability and API key
    Doctor,
}
