//! Monday.com backing-store adapter.
//!
//! Implements the [`Ledger`](crate::ledger::Ledger) and
//! [`SiteDirectory`](crate::site::SiteDirectory) ports against a Monday.com
//! workspace: segments are subitems of a day item on the timesheet board,
//! sites are items with a location column on the sites board.
//!
//! Board and column identifiers are configuration, not constants — every
//! workspace names its columns differently.

mod client;
mod directory;
mod ledger;
mod rollover;

pub use client::{GraphqlHttp, MondayClient, ReqwestGraphqlHttp, API_URL, API_VERSION};
pub use directory::MondaySiteDirectory;
pub use ledger::MondayLedger;
pub use rollover::{ensure_week, RolloverOutcome};

#[cfg(test)]
pub use client::tests::MockGraphqlHttp;

/// Column ids used on the timesheet and sites boards.
#[derive(Debug, Clone)]
pub struct ColumnIds {
    /// Time-tracking column on segment subitems.
    pub time_tracking: String,
    /// Board-relation column linking a segment to its site.
    pub site_link: String,
    /// End-date column on the day item.
    pub end: String,
    /// Location column on site items.
    pub location: String,
}

impl Default for ColumnIds {
    fn default() -> Self {
        Self {
            time_tracking: "tt".to_string(),
            site_link: "linked_site".to_string(),
            end: "end".to_string(),
            location: "location".to_string(),
        }
    }
}

/// Monday.com workspace configuration.
#[derive(Debug, Clone)]
pub struct MondayConfig {
    /// API token.
    pub token: String,
    /// Board holding weekly groups of day items (segments as subitems).
    pub timesheet_board: String,
    /// Board holding site items with a location column.
    pub sites_board: String,
    /// Column ids.
    pub columns: ColumnIds,
}

impl MondayConfig {
    /// Create a config with default column ids.
    pub fn new(
        token: impl Into<String>,
        timesheet_board: impl Into<String>,
        sites_board: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            timesheet_board: timesheet_board.into(),
            sites_board: sites_board.into(),
            columns: ColumnIds::default(),
        }
    }
}

/// Errors from the Monday.com adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MondayError {
    /// Network-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API returned an errors array.
    #[error("API error: {0}")]
    Api(String),

    /// The response did not contain the expected data.
    #[error("missing data: {0}")]
    MissingData(String),
}

impl From<MondayError> for crate::ledger::LedgerError {
    fn from(e: MondayError) -> Self {
        match e {
            MondayError::Http(m) => crate::ledger::LedgerError::Transport(m),
            MondayError::Api(m) => crate::ledger::LedgerError::Api(m),
            MondayError::MissingData(m) => crate::ledger::LedgerError::InvalidResponse(m),
        }
    }
}

impl From<MondayError> for crate::site::DirectoryError {
    fn from(e: MondayError) -> Self {
        match e {
            MondayError::Http(m) => crate::site::DirectoryError::Transport(m),
            MondayError::Api(m) => crate::site::DirectoryError::Api(m),
            MondayError::MissingData(m) => crate::site::DirectoryError::InvalidResponse(m),
        }
    }
}
