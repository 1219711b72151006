//! Start command - track one working day.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use geotimesheet::config::ConfigFile;
use geotimesheet::ledger::DayId;
use geotimesheet::monday::{MondayClient, MondayLedger, MondaySiteDirectory};
use geotimesheet::position::FixReceiver;
use geotimesheet::service::TrackingService;
use geotimesheet::telemetry;

use crate::error::CliError;

/// Arguments for the start command.
pub struct StartArgs {
    /// Day item id on the timesheet board.
    pub day: String,
    /// UDP port override for the fix receiver.
    pub port: Option<u16>,
    /// Distance threshold override in meters.
    pub threshold: Option<f64>,
    /// Directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

/// Run the start command.
pub fn run(args: StartArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let _log_guard = telemetry::init_logging("info", args.log_dir.as_deref());

    if config.monday.token.is_empty() {
        return Err(CliError::Config(
            "monday.token is not set. Run 'geotimesheet config set monday.token <TOKEN>'."
                .to_string(),
        ));
    }
    if config.monday.sites_board.is_empty() {
        return Err(CliError::Config(
            "monday.sites_board is not set. Run 'geotimesheet config set monday.sites_board <ID>'."
                .to_string(),
        ));
    }

    // Resolve settings from CLI and config
    let mut receiver_config = config.receiver_config();
    if let Some(port) = args.port {
        receiver_config.port = port;
    }
    let mut service_config = config.service_config();
    if let Some(threshold) = args.threshold {
        service_config.tracker.distance_threshold_m = threshold;
    }
    let monday_config = config.monday_config();

    // Print banner
    println!("GeoTimesheet v{}", geotimesheet::VERSION);
    println!("=================");
    println!();
    println!("Day item:  {}", args.day);
    println!("Fix port:  {} (UDP)", receiver_config.port);
    println!(
        "Threshold: {:.0} m",
        service_config.tracker.distance_threshold_m
    );
    println!();
    println!("Press Ctrl+C to stop the timer and close the day");
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(async move {
        let client = Arc::new(MondayClient::connect(monday_config.token.clone())?);
        let ledger = Arc::new(MondayLedger::new(client.clone(), monday_config.clone()));
        let directory = Arc::new(MondaySiteDirectory::new(client, monday_config));

        let (fix_tx, fix_rx) = tokio::sync::mpsc::channel(32);
        let (service, handle) = TrackingService::new(
            ledger,
            directory,
            DayId::new(args.day),
            fix_rx,
            service_config,
        );

        // Fix receiver shuts down with the service
        let receiver = FixReceiver::new(receiver_config, fix_tx);
        let receiver_cancel = handle.cancellation();
        let receiver_task = tokio::spawn(async move {
            if let Err(e) = receiver.run(receiver_cancel).await {
                tracing::warn!(error = %e, "Fix receiver stopped");
            }
        });

        // First Ctrl+C ends the day; a second aborts without closing it
        let signalled = Arc::new(AtomicBool::new(false));
        let signal_handle = handle.clone();
        ctrlc::set_handler(move || {
            if signalled.swap(true, Ordering::SeqCst) {
                println!();
                println!("Aborting without closing the day...");
                signal_handle.cancel();
            } else {
                println!();
                println!("Stopping timer and closing the day...");
                let _ = signal_handle.end_day_blocking();
            }
        })
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

        service.run().await;
        handle.cancellation().cancel();
        let _ = receiver_task.await;

        let status = handle.status();
        println!();
        println!(
            "Done: {} segment(s) recorded, final state '{}'.",
            status.segments_opened, status.phase
        );
        Ok(())
    })
}
