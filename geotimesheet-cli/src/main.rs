//! GeoTimesheet CLI - command-line interface
//!
//! Tracks a working day against the configured Monday.com workspace and
//! provisions weekly day items.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::start::StartArgs;

#[derive(Debug, Parser)]
#[command(
    name = "geotimesheet",
    version = geotimesheet::VERSION,
    about = "Automatic geofenced timesheets for mobile site work"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Track a working day: receive fixes and record segments
    Start {
        /// Day item id on the timesheet board
        #[arg(long)]
        day: String,

        /// UDP port to receive fix datagrams on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Segment-switch distance threshold in meters (overrides config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Write daily-rolling log files into this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Create the coming week's group and day items on the timesheet board
    Rollover,

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            day,
            port,
            threshold,
            log_dir,
        } => commands::start::run(StartArgs {
            day,
            port,
            threshold,
            log_dir,
        }),
        Commands::Rollover => commands::rollover::run(),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
