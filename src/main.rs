//! Octavia - voice, vision, and text personal assistant.
//!
//! This is the main entry point for the Rust rewrite.

use clap::Parser;
use std::process::ExitCode;

mod chat;
mod cli;
mod config;
mod core;
mod error;
mod logging;
mod persona;
mod providers;
mod store;
mod vercel;

use cli::Commands;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let _guard = match logging::init() {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Parse command line arguments
    let args = Commands::parse();

    // Run the command
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
