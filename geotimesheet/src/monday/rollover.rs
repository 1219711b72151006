//! Weekly calendar-row provisioning.
//!
//! Creates the coming week's group on the timesheet board with one day
//! item per workday, so the tracker always has a day item to attach
//! segments to. Provisioning is idempotent: an existing group with the
//! same title is left untouched.

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::{json, Value};

use super::client::{id_from_value, numeric_id, MondayClient};
use super::{MondayConfig, MondayError};

const GROUPS_QUERY: &str =
    "query ($board: Int!) { boards (ids: [$board]) { groups { title } } }";

const CREATE_GROUP: &str = "mutation ($board: Int!, $name: String!) {\
 create_group (board_id: $board, group_name: $name) { id } }";

const CREATE_ITEM: &str = "mutation ($board: Int!, $group: String!, $name: String!) {\
 create_item (board_id: $board, group_id: $group, item_name: $name) { id } }";

const WORKDAYS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Result of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverOutcome {
    /// The week's group already existed; nothing was created.
    AlreadyProvisioned { group_title: String },

    /// A new group with one item per workday was created.
    Created { group_title: String, days: usize },
}

/// The Monday on or after `today` (UTC date), used as the group title.
fn week_start(today: NaiveDate) -> NaiveDate {
    let days_until = (1 + 7 - today.weekday().num_days_from_sunday() as i64) % 7;
    today + Duration::days(days_until)
}

/// Ensure the coming week's group and day items exist.
///
/// # Errors
///
/// Any API failure aborts provisioning; re-running is safe because the
/// group-title check makes the operation idempotent.
pub async fn ensure_week(
    client: &MondayClient,
    config: &MondayConfig,
    today: NaiveDate,
) -> Result<RolloverOutcome, MondayError> {
    let board = numeric_id(&config.timesheet_board)?;
    let group_title = week_start(today).format("%Y-%m-%d").to_string();

    let data = client
        .execute(GROUPS_QUERY, json!({ "board": board }))
        .await?;
    let exists = data
        .get("boards")
        .and_then(Value::as_array)
        .and_then(|boards| boards.first())
        .and_then(|b| b.get("groups"))
        .and_then(Value::as_array)
        .map(|groups| {
            groups
                .iter()
                .any(|g| g.get("title").and_then(Value::as_str) == Some(group_title.as_str()))
        })
        .ok_or_else(|| MondayError::MissingData("groups query returned no board".to_string()))?;

    if exists {
        tracing::debug!(group = %group_title, "Week already provisioned");
        return Ok(RolloverOutcome::AlreadyProvisioned { group_title });
    }

    let data = client
        .execute(
            CREATE_GROUP,
            json!({ "board": board, "name": group_title }),
        )
        .await?;
    let group_id = data
        .get("create_group")
        .and_then(|g| g.get("id"))
        .and_then(id_from_value)
        .ok_or_else(|| MondayError::MissingData("create_group returned no id".to_string()))?;

    for day in WORKDAYS {
        client
            .execute(
                CREATE_ITEM,
                json!({ "board": board, "group": group_id, "name": day }),
            )
            .await?;
    }

    tracing::info!(group = %group_title, days = WORKDAYS.len(), "Week provisioned");
    Ok(RolloverOutcome::Created {
        group_title,
        days: WORKDAYS.len(),
    })
}
