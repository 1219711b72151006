//! Tracker state model.
//!
//! `TrackerState` is an explicitly owned value, mutated only by the
//! tracker after a successful ledger response. Keeping it a plain value
//! (rather than module-level mutable state) makes every transition
//! unit-testable without a live backing store.

use std::fmt;

use crate::coord::Coordinate;
use crate::ledger::{DayId, SegmentId};
use crate::site::SiteId;

/// The tracker's reference to an open segment.
///
/// The segment row itself is owned by the ledger; the tracker holds only
/// the id it was assigned and the site it is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSegment {
    /// Ledger-assigned segment id.
    pub id: SegmentId,
    /// Site the segment is attributed to.
    pub site: SiteId,
}

/// Day context the tracker is operating in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum DayContext {
    /// No day record is known; fixes are ignored.
    #[default]
    Idle,

    /// A day record is active and fixes drive transitions.
    Tracking(DayId),

    /// The day was explicitly ended. Terminal until a new day begins.
    Closed(DayId),
}

/// Observable phase of the tracker, for status display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// No day context known.
    Idle,
    /// Day active, no open segment.
    Tracking,
    /// Day active with an open segment.
    SegmentOpen,
    /// Day closed.
    Closed,
}

impl fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerPhase::Idle => write!(f, "idle"),
            TrackerPhase::Tracking => write!(f, "tracking"),
            TrackerPhase::SegmentOpen => write!(f, "segment-open"),
            TrackerPhase::Closed => write!(f, "closed"),
        }
    }
}

/// Owned tracker state: day context, open-segment reference, last fix.
///
/// Invariant: `segment` is only `Some` while the day context is tracking.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    context: DayContext,
    segment: Option<OpenSegment>,
    last_fix: Option<Coordinate>,
}

impl TrackerState {
    /// Initial (idle) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> TrackerPhase {
        match (&self.context, &self.segment) {
            (DayContext::Idle, _) => TrackerPhase::Idle,
            (DayContext::Closed(_), _) => TrackerPhase::Closed,
            (DayContext::Tracking(_), Some(_)) => TrackerPhase::SegmentOpen,
            (DayContext::Tracking(_), None) => TrackerPhase::Tracking,
        }
    }

    /// The active day, if tracking.
    pub fn day(&self) -> Option<&DayId> {
        match &self.context {
            DayContext::Tracking(day) => Some(day),
            _ => None,
        }
    }

    /// The open segment, if any.
    pub fn segment(&self) -> Option<&OpenSegment> {
        self.segment.as_ref()
    }

    /// Last recorded fix position.
    pub fn last_fix(&self) -> Option<Coordinate> {
        self.last_fix
    }

    /// Enter a new day context, discarding any previous one.
    pub(super) fn begin_day(&mut self, day: DayId) {
        self.context = DayContext::Tracking(day);
        self.segment = None;
        self.last_fix = None;
    }

    /// Record the latest known position.
    pub(super) fn record_fix(&mut self, position: Coordinate) {
        self.last_fix = Some(position);
    }

    /// Commit a newly opened segment.
    pub(super) fn open_segment(&mut self, segment: OpenSegment) {
        debug_assert!(
            matches!(self.context, DayContext::Tracking(_)),
            "segment opened outside a tracking day"
        );
        self.segment = Some(segment);
    }

    /// Drop the open-segment reference (after a successful stop, or as the
    /// fallback when the start half of a switch failed).
    pub(super) fn clear_segment(&mut self) {
        self.segment = None;
    }

    /// Mark the day closed. Terminal for this day.
    pub(super) fn close_day(&mut self) {
        if let DayContext::Tracking(day) = std::mem::take(&mut self.context) {
            self.context = DayContext::Closed(day);
        }
        self.segment = None;
    }
}
