//! Ledger implementation over Monday.com subitems.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::{json, Value};

use crate::ledger::{DayId, Ledger, LedgerError, SegmentId};
use crate::site::SiteId;

use super::client::{id_from_value, numeric_id, MondayClient};
use super::{MondayConfig, MondayError};

const CREATE_SUBITEM: &str = "mutation ($parent: Int!, $name: String!, $values: JSON!) {\
 create_subitem (parent_item_id: $parent, item_name: $name, column_values: $values) { id } }";

const CHANGE_COLUMN_VALUE: &str = "mutation ($item: Int!, $column: String!, $value: JSON!) {\
 change_column_value (item_id: $item, column_id: $column, value: $value) { id } }";

/// Segment/day ledger backed by a Monday.com timesheet board.
///
/// A segment is a subitem named "Segment" under the day item, linked to its
/// site through the board-relation column, with the time-tracking column
/// running while the segment is open. Closing a day stamps the end-date
/// column on the day item with the current UTC time.
pub struct MondayLedger {
    client: Arc<MondayClient>,
    config: MondayConfig,
}

impl MondayLedger {
    /// Create a ledger over an existing client.
    pub fn new(client: Arc<MondayClient>, config: MondayConfig) -> Self {
        Self { client, config }
    }

    async fn set_column(
        &self,
        item: i64,
        column: &str,
        value: Value,
    ) -> Result<(), MondayError> {
        self.client
            .execute(
                CHANGE_COLUMN_VALUE,
                json!({
                    "item": item,
                    "column": column,
                    "value": value.to_string(),
                }),
            )
            .await?;
        Ok(())
    }

    async fn start_inner(&self, site: SiteId, day: DayId) -> Result<SegmentId, MondayError> {
        let parent = numeric_id(day.as_str())?;
        let site_item = numeric_id(site.as_str())?;

        let mut column_values = serde_json::Map::new();
        column_values.insert(
            self.config.columns.site_link.clone(),
            json!({ "item_ids": [site_item] }),
        );
        let column_values = Value::Object(column_values);

        let data = self
            .client
            .execute(
                CREATE_SUBITEM,
                json!({
                    "parent": parent,
                    "name": "Segment",
                    "values": column_values.to_string(),
                }),
            )
            .await?;

        let segment = data
            .get("create_subitem")
            .and_then(|s| s.get("id"))
            .and_then(id_from_value)
            .ok_or_else(|| {
                MondayError::MissingData("create_subitem returned no id".to_string())
            })?;

        // Start the clock on the new subitem. If this half fails the
        // subitem exists without a running timer and needs manual cleanup;
        // the caller treats the whole start as failed.
        self.set_column(
            numeric_id(&segment)?,
            &self.config.columns.time_tracking,
            json!({ "running": "true" }),
        )
        .await?;

        Ok(SegmentId::new(segment))
    }

    async fn stop_inner(&self, segment: SegmentId) -> Result<(), MondayError> {
        self.set_column(
            numeric_id(segment.as_str())?,
            &self.config.columns.time_tracking,
            json!({ "running": "false" }),
        )
        .await
    }

    async fn close_inner(&self, day: DayId) -> Result<(), MondayError> {
        self.set_column(
            numeric_id(day.as_str())?,
            &self.config.columns.end,
            json!(Utc::now().to_rfc3339()),
        )
        .await
    }
}

impl Ledger for MondayLedger {
    fn start(&self, site: SiteId, day: DayId) -> BoxFuture<'_, Result<SegmentId, LedgerError>> {
        Box::pin(async move { self.start_inner(site, day).await.map_err(Into::into) })
    }

    fn stop(&self, segment: SegmentId) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(async move { self.stop_inner(segment).await.map_err(Into::into) })
    }

    fn close(&self, day: DayId) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(async move { self.close_inner(day).await.map_err(Into::into) })
    }
}
