//! # Bangumi Explorer
//!
//! The main binary for the Bangumi catalog explorer.
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! bangumi server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! bangumi browse "y=2014-2014&se=spring&t=TV"
//! bangumi presets --apply hidden-gems
//! bangumi mark 253 collected
//! ```

use bangumi::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // BANGUMI_LOG_FORMAT=json enables machine-parseable output. Logs go to
    // stderr so `--json-mode` output stays clean.
    let log_format = std::env::var("BANGUMI_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "bangumi=debug,tower_http=debug"
    } else {
        "bangumi=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!("Bangumi Explorer v{}", env!("CARGO_PKG_VERSION"));
    println!();
}
