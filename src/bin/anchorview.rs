//! Anchorview CLI Binary
//!
//! Prints the records surrounding one anchor record of a search index.

use anchorview::cli::{execute, Cli};
use anchorview::logging::init_logging;
use clap::Parser;
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    // Initialize logging early
    if let Err(e) = init_logging(Some(&cli.logging_config(Some(&config)))) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Anchorview CLI starting");

    match execute(&cli, config).await {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}
