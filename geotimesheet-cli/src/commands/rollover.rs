//! Rollover command - provision the coming week's day items.

use std::sync::Arc;

use chrono::Utc;

use geotimesheet::config::ConfigFile;
use geotimesheet::monday::{ensure_week, MondayClient, RolloverOutcome};
use geotimesheet::telemetry;

use crate::error::CliError;

/// Run the rollover command.
pub fn run() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let _log_guard = telemetry::init_logging("info", None);

    if config.monday.token.is_empty() {
        return Err(CliError::Config(
            "monday.token is not set. Run 'geotimesheet config set monday.token <TOKEN>'."
                .to_string(),
        ));
    }
    if config.monday.timesheet_board.is_empty() {
        return Err(CliError::Config(
            "monday.timesheet_board is not set. \
             Run 'geotimesheet config set monday.timesheet_board <ID>'."
                .to_string(),
        ));
    }

    let monday_config = config.monday_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let outcome = runtime.block_on(async {
        let client = Arc::new(MondayClient::connect(monday_config.token.clone())?);
        ensure_week(&client, &monday_config, Utc::now().date_naive())
            .await
            .map_err(CliError::from)
    })?;

    match outcome {
        RolloverOutcome::AlreadyProvisioned { group_title } => {
            println!("Week {} already exists; nothing to do.", group_title);
        }
        RolloverOutcome::Created { group_title, days } => {
            println!("Created week {} with {} day items.", group_title, days);
        }
    }
    Ok(())
}
