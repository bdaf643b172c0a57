//! # Bangumi CLI Module
//!
//! This module implements the CLI interface for the explorer.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `browse` - Print one page of results for a query string
//! - `show` - Show one subject
//! - `mark` - Set or clear a subject's status
//! - `presets` - List presets, or toggle one on a query string
//! - `stats` - Catalog and status counters
//! - `export` - Write the statuses to a snapshot file
//! - `import` - Replace the statuses from a snapshot or legacy file

mod commands;

use crate::config::AppConfig;
use bangumi_core::ExplorerError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Bangumi explorer
///
/// Browse an anime catalog with range filters, categories, search, personal
/// statuses and presets. Query states use the same query-string format as
/// the web frontend.
#[derive(Parser, Debug)]
#[command(name = "bangumi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./bangumi.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog JSON file
    #[arg(short = 'C', long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Status database path
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Subjects per page
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print one page of results
    Browse {
        /// Query string, e.g. "y=2014-2014&se=spring&t=TV"
        #[arg(default_value = "")]
        query: String,

        /// Page to show, overriding the query string
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Show one subject
    Show {
        /// Subject ID
        id: u64,
    },

    /// Set or clear a subject's status
    Mark {
        /// Subject ID
        id: u64,

        /// collected, wishlist, ignored or none
        status: String,
    },

    /// List presets for a query string, or toggle one
    Presets {
        /// Query string to evaluate presets against
        #[arg(default_value = "")]
        query: String,

        /// Preset to apply (or toggle off when already active)
        #[arg(short, long)]
        apply: Option<String>,
    },

    /// Show catalog and status counters
    Stats,

    /// Export statuses to a snapshot file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace statuses from a snapshot or a legacy id list
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },
}

impl Cli {
    /// Resolve the configuration: file first, then flags.
    pub fn resolve_config(&self) -> Result<AppConfig, ExplorerError> {
        let mut config = AppConfig::load(self.config.as_deref())?;

        if let Some(catalog) = &self.catalog {
            config.catalog.clone_from(catalog);
        }
        if let Some(database) = &self.database {
            config.database.clone_from(database);
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(Commands::Server { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }

        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ExplorerError> {
    let config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&config).await,
        Some(Commands::Browse { query, page }) => cmd_browse(&config, json_mode, &query, page),
        Some(Commands::Show { id }) => cmd_show(&config, json_mode, id),
        Some(Commands::Mark { id, status }) => cmd_mark(&config, json_mode, id, &status),
        Some(Commands::Presets { query, apply }) => {
            cmd_presets(json_mode, &query, apply.as_deref())
        }
        Some(Commands::Export { output }) => cmd_export(&config, &output),
        Some(Commands::Import { input }) => cmd_import(&config, &input),
        Some(Commands::Stats) | None => cmd_stats(&config, json_mode),
    }
}

// =============================================================================
// TESTS
// =============================================================================
