//! Shared tracking status for UI display.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::ledger::SegmentId;
use crate::site::SiteId;
use crate::tracker::TrackerPhase;

/// Point-in-time view of the tracking service.
#[derive(Debug, Clone)]
pub struct TrackerStatus {
    /// Current tracker phase.
    pub phase: TrackerPhase,
    /// Site of the open segment, if any.
    pub current_site: Option<SiteId>,
    /// Open segment id, if any.
    pub open_segment: Option<SegmentId>,
    /// Timestamp of the last processed fix.
    pub last_fix_at: Option<DateTime<Utc>>,
    /// Segments opened since the service started.
    pub segments_opened: u64,
    /// Sites in the current snapshot.
    pub sites_known: usize,
}

impl Default for TrackerStatus {
    fn default() -> Self {
        Self {
            phase: TrackerPhase::Idle,
            current_site: None,
            open_segment: None,
            last_fix_at: None,
            segments_opened: 0,
            sites_known: 0,
        }
    }
}

/// Thread-safe status cell shared between the service and its observers.
#[derive(Clone, Default)]
pub struct SharedTrackerStatus {
    inner: Arc<RwLock<TrackerStatus>>,
}

impl SharedTrackerStatus {
    /// Create a status cell in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a point-in-time copy.
    pub fn snapshot(&self) -> TrackerStatus {
        self.inner.read().clone()
    }

    /// Apply a mutation under the write lock.
    pub(crate) fn update(&self, f: impl FnOnce(&mut TrackerStatus)) {
        f(&mut self.inner.write());
    }
}
