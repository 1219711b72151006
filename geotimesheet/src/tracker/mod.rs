//! Geofenced segment-tracking state machine.
//!
//! Consumes a stream of validated fixes together with the resolved nearest
//! site and decides when to open, switch, and close timesheet segments
//! against the [`Ledger`] port.
//!
//! # States
//!
//! ```text
//! Idle ──begin_day──► Tracking ──start ok──► SegmentOpen
//!                        ▲                       │
//!                        └──stop ok / gap────────┘
//!                     Tracking or SegmentOpen ──end_day──► Closed
//! ```
//!
//! # Hysteresis
//!
//! A segment switch requires BOTH a different nearest site AND movement
//! beyond the distance threshold since the last recorded fix. Positional
//! jitter near a boundary therefore never toggles segments, and a single
//! missing/noisy resolution ("no nearest site") while a segment is open is
//! absorbed rather than flapping to "no site". The movement anchor is the
//! worker's own last fix, not the site location: sites are points, so the
//! hysteresis band follows the trajectory rather than a fixed boundary.
//!
//! # Ledger sequencing
//!
//! Every transition commits only after the ledger call succeeds. A switch
//! is two sequenced calls (stop, then start); if the start half fails the
//! tracker lands in "no open segment" and surfaces the gap instead of
//! silently keeping the stale segment reference. All methods take
//! `&mut self`, so there is never more than one in-flight ledger call and
//! a day change cannot interleave with an outstanding call.

mod state;

pub use state::{OpenSegment, TrackerPhase, TrackerState};

use std::fmt;
use std::sync::Arc;

use crate::coord::distance_meters;
use crate::fix::Fix;
use crate::ledger::{DayId, Ledger, LedgerError, SegmentId};
use crate::site::{Site, SiteId};

/// Default movement threshold for a segment switch, in meters.
///
/// Rejects GPS jitter while still catching real site-to-site walks.
pub const DEFAULT_DISTANCE_THRESHOLD_M: f64 = 150.0;

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Movement required (against the last recorded fix) before a segment
    /// switch is considered, in meters.
    pub distance_threshold_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            distance_threshold_m: DEFAULT_DISTANCE_THRESHOLD_M,
        }
    }
}

impl TrackerConfig {
    /// Set the movement threshold.
    pub fn with_distance_threshold(mut self, meters: f64) -> Self {
        self.distance_threshold_m = meters;
        self
    }
}

/// What a processed fix resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// No day context (or day closed); the fix was a no-op.
    Ignored,

    /// Position recorded, no segment change.
    Recorded,

    /// A segment was opened.
    SegmentOpened { segment: SegmentId, site: SiteId },

    /// The open segment was stopped and a new one opened at another site.
    SegmentSwitched {
        closed: SegmentId,
        segment: SegmentId,
        site: SiteId,
    },
}

/// Errors from tracker transitions.
///
/// Any error leaves the tracker in a consistent state: either the state it
/// had before the fix, or (for `SegmentGap`) "no open segment".
#[derive(Debug)]
pub enum TrackerError {
    /// A ledger call failed; the transition was not applied.
    Ledger(LedgerError),

    /// A switch stopped the old segment but could not start the new one.
    /// The tracker is left with no open segment; the untracked interval
    /// needs manual reconciliation in the ledger.
    SegmentGap {
        stopped: SegmentId,
        site: SiteId,
        source: LedgerError,
    },
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Ledger(e) => write!(f, "Ledger call failed: {}", e),
            TrackerError::SegmentGap {
                stopped,
                site,
                source,
            } => write!(
                f,
                "Segment {} was stopped but no segment could be started at site {}: {}",
                stopped, site, source
            ),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Ledger(e) => Some(e),
            TrackerError::SegmentGap { source, .. } => Some(source),
        }
    }
}

/// Transition decision for one fix. Pure: no I/O, no state mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Ignore,
    Record,
    Open(SiteId),
    Switch { stop: SegmentId, open: SiteId },
}

fn decide(
    state: &TrackerState,
    fix: &Fix,
    nearest: Option<&Site>,
    threshold_m: f64,
) -> Decision {
    // Idle and Closed both lack an active day: nothing to do.
    if state.day().is_none() {
        return Decision::Ignore;
    }

    let Some(open) = state.segment() else {
        return match nearest {
            None => Decision::Record,
            Some(site) => Decision::Open(site.id.clone()),
        };
    };

    let Some(site) = nearest else {
        return Decision::Record;
    };
    if site.id == open.site {
        return Decision::Record;
    }

    let moved = match state.last_fix() {
        Some(last) => distance_meters(&fix.location(), &last) > threshold_m,
        None => true,
    };

    if moved {
        Decision::Switch {
            stop: open.id.clone(),
            open: site.id.clone(),
        }
    } else {
        Decision::Record
    }
}

/// The segment-tracking state machine.
///
/// Single logical writer: all transitions go through `&mut self`, which
/// structurally enforces one fix processed to completion (including its
/// ledger round-trips) at a time and at most one outstanding ledger call.
pub struct SegmentTracker {
    state: TrackerState,
    config: TrackerConfig,
    ledger: Arc<dyn Ledger>,
}

impl SegmentTracker {
    /// Create a tracker in the idle state.
    pub fn new(ledger: Arc<dyn Ledger>, config: TrackerConfig) -> Self {
        Self {
            state: TrackerState::new(),
            config,
            ledger,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> TrackerPhase {
        self.state.phase()
    }

    /// Current state (read-only).
    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Enter a new day context.
    ///
    /// Any open segment from a previous day is abandoned in the tracker
    /// (its ledger row stays open for manual reconciliation); the normal
    /// path is to call [`end_day`](Self::end_day) first.
    pub fn begin_day(&mut self, day: DayId) {
        if let Some(open) = self.state.segment() {
            tracing::warn!(
                segment = %open.id,
                site = %open.site,
                "Beginning a new day with a segment still open; abandoning it"
            );
        }
        tracing::info!(day = %day, "Day tracking started");
        self.state.begin_day(day);
    }

    /// Process one fix with its resolved nearest site.
    ///
    /// # Errors
    ///
    /// - `TrackerError::Ledger` — the triggering ledger call failed; the
    ///   tracker state is unchanged and the next fix retries naturally.
    /// - `TrackerError::SegmentGap` — a switch stopped the old segment but
    ///   failed to start the new one; the tracker has no open segment.
    pub async fn on_fix(
        &mut self,
        fix: &Fix,
        nearest: Option<&Site>,
    ) -> Result<FixOutcome, TrackerError> {
        match decide(&self.state, fix, nearest, self.config.distance_threshold_m) {
            Decision::Ignore => Ok(FixOutcome::Ignored),

            Decision::Record => {
                self.state.record_fix(fix.location());
                Ok(FixOutcome::Recorded)
            }

            Decision::Open(site) => {
                let day = self
                    .state
                    .day()
                    .cloned()
                    .expect("open decision outside a tracking day");
                let segment = self
                    .ledger
                    .start(site.clone(), day.clone())
                    .await
                    .map_err(TrackerError::Ledger)?;

                tracing::info!(
                    segment = %segment,
                    site = %site,
                    day = %day,
                    "Segment opened"
                );
                self.state.open_segment(OpenSegment {
                    id: segment.clone(),
                    site: site.clone(),
                });
                self.state.record_fix(fix.location());
                Ok(FixOutcome::SegmentOpened { segment, site })
            }

            Decision::Switch { stop, open } => {
                let day = self
                    .state
                    .day()
                    .cloned()
                    .expect("switch decision outside a tracking day");

                self.ledger
                    .stop(stop.clone())
                    .await
                    .map_err(TrackerError::Ledger)?;
                // The stop is committed in the ledger; from here on the
                // tracker must not claim the old segment is still open.
                self.state.clear_segment();

                match self.ledger.start(open.clone(), day.clone()).await {
                    Ok(segment) => {
                        tracing::info!(
                            closed = %stop,
                            segment = %segment,
                            site = %open,
                            "Segment switched"
                        );
                        self.state.open_segment(OpenSegment {
                            id: segment.clone(),
                            site: open.clone(),
                        });
                        self.state.record_fix(fix.location());
                        Ok(FixOutcome::SegmentSwitched {
                            closed: stop,
                            segment,
                            site: open,
                        })
                    }
                    Err(source) => {
                        tracing::warn!(
                            stopped = %stop,
                            site = %open,
                            error = %source,
                            "Segment switch stopped the old segment but could not start the new one"
                        );
                        Err(TrackerError::SegmentGap {
                            stopped: stop,
                            site: open,
                            source,
                        })
                    }
                }
            }
        }
    }

    /// Explicitly end the day: stop the open segment (if any), then close
    /// the day record. Returns `false` when there is no day to close.
    ///
    /// # Errors
    ///
    /// On a failed `stop` the segment stays open and the day stays active,
    /// so the command can simply be retried. On a failed `close` the
    /// segment is already stopped; a retry issues only the close.
    pub async fn end_day(&mut self) -> Result<bool, TrackerError> {
        let Some(day) = self.state.day().cloned() else {
            return Ok(false);
        };

        if let Some(open) = self.state.segment().cloned() {
            self.ledger
                .stop(open.id.clone())
                .await
                .map_err(TrackerError::Ledger)?;
            tracing::info!(segment = %open.id, site = %open.site, "Segment stopped");
            self.state.clear_segment();
        }

        self.ledger
            .close(day.clone())
            .await
            .map_err(TrackerError::Ledger)?;
        self.state.close_day();
        tracing::info!(day = %day, "Day closed");
        Ok(true)
    }
}
