//! Ledger port — the external system of record for segments and days.
//!
//! The tracker emits three effects against the ledger: open a segment,
//! stop a segment, close a day. All three are remote, fallible operations;
//! the tracker only commits a state transition after the corresponding
//! ledger call succeeds.
//!
//! # Dyn Compatibility
//!
//! The trait uses `BoxFuture` for its async methods so callers can hold an
//! `Arc<dyn Ledger>` and tests can substitute a recording mock.

use std::fmt;

use futures::future::BoxFuture;

use crate::site::SiteId;

/// Opaque identifier of a day record in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayId(String);

impl DayId {
    /// Create a day id from its ledger representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ledger representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a segment row, assigned by the ledger on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentId(String);

impl SegmentId {
    /// Create a segment id from its ledger representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ledger representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External system of record for segments and days.
///
/// Implementations are not required to make `start` idempotent; the caller
/// must never retry a `start` whose outcome is unknown without first
/// reconciling, or a duplicate segment row may be created. Retry policy
/// therefore lives in implementations, not in the tracker.
pub trait Ledger: Send + Sync {
    /// Create a new open segment for `site` under `day`.
    ///
    /// Returns the id the ledger assigned to the segment row.
    fn start(&self, site: SiteId, day: DayId) -> BoxFuture<'_, Result<SegmentId, LedgerError>>;

    /// Mark the end of an open segment.
    fn stop(&self, segment: SegmentId) -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Finalize the day record.
    fn close(&self, day: DayId) -> BoxFuture<'_, Result<(), LedgerError>>;
}

/// Errors from ledger operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// Network-level failure reaching the ledger.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// The ledger rejected the operation.
    #[error("ledger API error: {0}")]
    Api(String),

    /// The ledger response did not have the expected shape.
    #[error("unexpected ledger response: {0}")]
    InvalidResponse(String),
}
