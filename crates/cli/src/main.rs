//! # Tripo - Main Entry Point
//!
//! Command-line bootstrapper and launcher for TripoSR single-image 3D
//! reconstruction.

use clap::Parser;
use tripo_cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize logging with TRIPO_LOG environment variable, defaulting to warn
    let log_level = std::env::var("TRIPO_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(log_level)
        .init();

    let cli = Cli::parse();
    let code = match cli.run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            err.exit_code()
        }
    };
    std::process::exit(code);
}
