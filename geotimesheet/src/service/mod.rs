//! Tracking service orchestration.
//!
//! `TrackingService` wires the pieces together for one working day: it
//! consumes validated fixes from the receiver channel, keeps the site
//! snapshot fresh, drives the [`SegmentTracker`], and reacts to operator
//! commands (end-day). The loop processes exactly one fix to completion —
//! including any ledger round-trips — before looking at the next; fixes
//! that queued up meanwhile are conflated down to the newest one, since
//! only the latest position is useful once a decision is already made.
//!
//! # Shutdown
//!
//! - `ServiceCommand::EndDay` stops the open segment, closes the day, and
//!   ends the loop — the normal way to finish a day.
//! - Cancelling the token ends the loop immediately WITHOUT closing the
//!   day; the open segment keeps running in the ledger and the next start
//!   of the service picks the day up again.

mod error;
mod status;

pub use error::ServiceError;
pub use status::{SharedTrackerStatus, TrackerStatus};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::fix::Fix;
use crate::ledger::{DayId, Ledger};
use crate::site::{Site, SiteDirectory};
use crate::tracker::{FixOutcome, SegmentTracker, TrackerConfig};

/// Default site snapshot refresh cadence.
pub const DEFAULT_SITE_REFRESH: Duration = Duration::from_secs(300);

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// How often the site snapshot is refreshed.
    pub site_refresh: Duration,
    /// Tracker configuration.
    pub tracker: TrackerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            site_refresh: DEFAULT_SITE_REFRESH,
            tracker: TrackerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Set the snapshot refresh cadence.
    pub fn with_site_refresh(mut self, refresh: Duration) -> Self {
        self.site_refresh = refresh;
        self
    }

    /// Set the tracker configuration.
    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }
}

/// Operator commands accepted by the running service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    /// Stop the open segment (if any), close the day, and stop the service.
    EndDay,
}

/// Handle for interacting with a running service.
#[derive(Clone)]
pub struct ServiceHandle {
    commands: mpsc::Sender<ServiceCommand>,
    cancellation: CancellationToken,
    status: SharedTrackerStatus,
}

impl ServiceHandle {
    /// Request the end-day transition.
    pub async fn end_day(&self) -> Result<(), ServiceError> {
        self.commands
            .send(ServiceCommand::EndDay)
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    /// Request the end-day transition from a non-async context (e.g. a
    /// signal-handler thread).
    pub fn end_day_blocking(&self) -> Result<(), ServiceError> {
        self.commands
            .blocking_send(ServiceCommand::EndDay)
            .map_err(|_| ServiceError::Stopped)
    }

    /// Stop the service without closing the day.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// The cancellation token (for coordinating shutdown of the receiver).
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Current status snapshot.
    pub fn status(&self) -> TrackerStatus {
        self.status.snapshot()
    }
}

enum Event {
    Cancelled,
    Command(Option<ServiceCommand>),
    Fix(Option<Fix>),
}

/// Coordinates fix intake, site resolution, and the tracker for one day.
pub struct TrackingService {
    tracker: SegmentTracker,
    directory: Arc<dyn SiteDirectory>,
    day: DayId,
    fixes: mpsc::Receiver<Fix>,
    commands: mpsc::Receiver<ServiceCommand>,
    cancellation: CancellationToken,
    status: SharedTrackerStatus,
    config: ServiceConfig,
    snapshot: Vec<Site>,
    snapshot_at: Option<Instant>,
}

impl TrackingService {
    /// Create a service for one day and the handle to drive it.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        directory: Arc<dyn SiteDirectory>,
        day: DayId,
        fixes: mpsc::Receiver<Fix>,
        config: ServiceConfig,
    ) -> (Self, ServiceHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(4);
        let cancellation = CancellationToken::new();
        let status = SharedTrackerStatus::new();

        let handle = ServiceHandle {
            commands: commands_tx,
            cancellation: cancellation.clone(),
            status: status.clone(),
        };

        let service = Self {
            tracker: SegmentTracker::new(ledger, config.tracker.clone()),
            directory,
            day,
            fixes,
            commands: commands_rx,
            cancellation,
            status,
            config,
            snapshot: Vec::new(),
            snapshot_at: None,
        };

        (service, handle)
    }

    /// Run the service until the day is ended or the token is cancelled.
    pub async fn run(mut self) {
        tracing::info!(day = %self.day, "Tracking service started");
        self.tracker.begin_day(self.day.clone());
        self.publish_state();

        let cancellation = self.cancellation.clone();
        loop {
            let event = tokio::select! {
                biased;

                _ = cancellation.cancelled() => Event::Cancelled,
                command = self.commands.recv() => Event::Command(command),
                fix = self.fixes.recv() => Event::Fix(fix),
            };

            match event {
                Event::Cancelled => {
                    tracing::info!("Tracking service cancelled; day left open");
                    break;
                }
                Event::Command(None) => break,
                Event::Command(Some(ServiceCommand::EndDay)) => {
                    match self.tracker.end_day().await {
                        Ok(closed) => {
                            self.publish_state();
                            if closed {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                "End-day failed; resend the command to retry"
                            );
                            self.publish_state();
                        }
                    }
                }
                Event::Fix(None) => {
                    tracing::debug!("Fix channel closed");
                    break;
                }
                Event::Fix(Some(fix)) => self.handle_fix(fix).await,
            }
        }
        tracing::info!("Tracking service stopped");
    }

    async fn handle_fix(&mut self, mut fix: Fix) {
        // Latest-wins conflation: anything that queued up while the last
        // decision was in flight is superseded by the newest position.
        let mut dropped = 0usize;
        while let Ok(newer) = self.fixes.try_recv() {
            fix = newer;
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Conflated queued fixes down to the newest");
        }

        self.refresh_snapshot_if_due().await;

        let nearest = crate::site::nearest(&fix.location(), &self.snapshot);
        match self.tracker.on_fix(&fix, nearest).await {
            Ok(
                FixOutcome::SegmentOpened { .. } | FixOutcome::SegmentSwitched { .. },
            ) => {
                self.status.update(|s| s.segments_opened += 1);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Fix processing failed; tracker state unchanged");
            }
        }

        self.status.update(|s| s.last_fix_at = Some(fix.timestamp()));
        self.publish_state();
    }

    /// Refresh the site snapshot when the cadence has elapsed.
    ///
    /// On failure the previous snapshot keeps serving while it is not
    /// older than twice the refresh cadence; beyond that it is cleared and
    /// resolution degrades to "no nearest site" until a refresh succeeds.
    async fn refresh_snapshot_if_due(&mut self) {
        let due = match self.snapshot_at {
            None => true,
            Some(at) => at.elapsed() >= self.config.site_refresh,
        };
        if !due {
            return;
        }

        match self.directory.fetch_all().await {
            Ok(sites) => {
                tracing::debug!(sites = sites.len(), "Site snapshot refreshed");
                self.snapshot = sites;
                self.snapshot_at = Some(Instant::now());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Site snapshot refresh failed");
                let unusable = self
                    .snapshot_at
                    .map_or(true, |at| at.elapsed() >= self.config.site_refresh * 2);
                if unusable && !self.snapshot.is_empty() {
                    tracing::warn!("Discarding outdated site snapshot");
                    self.snapshot.clear();
                }
            }
        }
    }

    fn publish_state(&self) {
        let phase = self.tracker.phase();
        let segment = self.tracker.state().segment().cloned();
        let sites_known = self.snapshot.len();
        self.status.update(|s| {
            s.phase = phase;
            s.current_site = segment.as_ref().map(|o| o.site.clone());
            s.open_segment = segment.map(|o| o.id);
            s.sites_known = sites_known;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::coord::Coordinate;
    use crate::ledger::tests::{LedgerCall, RecordingLedger};
    use crate::ledger::SegmentId;
    use crate::site::{SiteId, StaticSiteDirectory};
    use crate::tracker::TrackerPhase;

    fn fix(lat: f64, lon: f64) -> Fix {
        Fix::new(
            Coordinate::new(lat, lon).unwrap(),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
    }

    fn one_site() -> Vec<Site> {
        vec![Site::new("42", Coordinate::new(0.0, 0.0).unwrap())]
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 2s");
    }

    #[tokio::test]
    async fn test_full_day_flow() {
        let ledger = Arc::new(RecordingLedger::new());
        let directory = Arc::new(StaticSiteDirectory::new(one_site()));
        let (fix_tx, fix_rx) = mpsc::channel(16);

        let (service, handle) = TrackingService::new(
            ledger.clone(),
            directory,
            DayId::new("day-1"),
            fix_rx,
            ServiceConfig::default(),
        );
        let join = tokio::spawn(service.run());

        fix_tx.send(fix(0.0, 0.0)).await.unwrap();
        wait_for(|| handle.status().segments_opened == 1).await;

        let status = handle.status();
        assert_eq!(status.phase, TrackerPhase::SegmentOpen);
        assert_eq!(status.current_site, Some(SiteId::new("42")));
        assert_eq!(status.sites_known, 1);

        handle.end_day().await.unwrap();
        join.await.unwrap();

        assert_eq!(
            ledger.calls(),
            vec![
                LedgerCall::Start {
                    site: SiteId::new("42"),
                    day: DayId::new("day-1"),
                },
                LedgerCall::Stop {
                    segment: SegmentId::new("seg-1"),
                },
                LedgerCall::Close {
                    day: DayId::new("day-1"),
                },
            ]
        );
        assert_eq!(handle.status().phase, TrackerPhase::Closed);
    }

    #[tokio::test]
    async fn test_directory_failure_degrades_to_no_site() {
        let ledger = Arc::new(RecordingLedger::new());
        let directory = Arc::new(StaticSiteDirectory::failing());
        let (fix_tx, fix_rx) = mpsc::channel(16);

        let (service, handle) = TrackingService::new(
            ledger.clone(),
            directory,
            DayId::new("day-1"),
            fix_rx,
            ServiceConfig::default(),
        );
        let join = tokio::spawn(service.run());

        fix_tx.send(fix(0.0, 0.0)).await.unwrap();
        wait_for(|| handle.status().last_fix_at.is_some()).await;

        // No snapshot, no nearest site: position recorded, nothing emitted
        assert_eq!(ledger.call_count(), 0);
        assert_eq!(handle.status().phase, TrackerPhase::Tracking);

        handle.end_day().await.unwrap();
        join.await.unwrap();
        assert_eq!(
            ledger.calls(),
            vec![LedgerCall::Close {
                day: DayId::new("day-1"),
            }]
        );
    }

    #[tokio::test]
    async fn test_cancel_leaves_day_open() {
        let ledger = Arc::new(RecordingLedger::new());
        let directory = Arc::new(StaticSiteDirectory::new(one_site()));
        let (fix_tx, fix_rx) = mpsc::channel(16);

        let (service, handle) = TrackingService::new(
            ledger.clone(),
            directory,
            DayId::new("day-1"),
            fix_rx,
            ServiceConfig::default(),
        );
        let join = tokio::spawn(service.run());

        fix_tx.send(fix(0.0, 0.0)).await.unwrap();
        wait_for(|| handle.status().segments_opened == 1).await;

        handle.cancel();
        join.await.unwrap();

        // No stop, no close: the segment keeps running in the ledger
        assert_eq!(ledger.call_count(), 1);
    }

    #[tokio::test]
    async fn test_end_day_failure_is_retryable() {
        let ledger = Arc::new(RecordingLedger::new());
        let directory = Arc::new(StaticSiteDirectory::new(one_site()));
        let (fix_tx, fix_rx) = mpsc::channel(16);

        let (service, handle) = TrackingService::new(
            ledger.clone(),
            directory,
            DayId::new("day-1"),
            fix_rx,
            ServiceConfig::default(),
        );
        let join = tokio::spawn(service.run());

        fix_tx.send(fix(0.0, 0.0)).await.unwrap();
        wait_for(|| handle.status().segments_opened == 1).await;

        ledger.set_fail_close(true);
        handle.end_day().await.unwrap();
        wait_for(|| handle.status().open_segment.is_none()).await;
        assert_eq!(handle.status().phase, TrackerPhase::Tracking);

        ledger.set_fail_close(false);
        handle.end_day().await.unwrap();
        join.await.unwrap();
        assert_eq!(handle.status().phase, TrackerPhase::Closed);
    }
}
