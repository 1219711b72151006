//! GeoTimesheet - automatic site-presence timesheets
//!
//! This library tracks a mobile worker's presence across a set of known
//! geographic sites and records time segments in an external ledger as the
//! worker moves. The core is a geofenced state machine: a live stream of
//! GPS fixes is matched against the nearest known site, and segment
//! start/stop/close effects are emitted with hysteresis so that GPS jitter
//! never flaps the segment history.
//!
//! # Architecture
//!
//! ```text
//! UDP datagrams ──► FixReceiver ──► TrackingService ──► SegmentTracker
//!                                       │                    │
//!                             SiteDirectory (snapshot)   Ledger (effects)
//!                                       └──── Monday.com ────┘
//! ```

pub mod config;
pub mod coord;
pub mod fix;
pub mod ledger;
pub mod monday;
pub mod position;
pub mod service;
pub mod site;
pub mod telemetry;
pub mod tracker;

/// Crate version, for CLI banners and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
