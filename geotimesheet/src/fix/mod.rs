//! GPS fix model.
//!
//! A [`Fix`] is one timestamped position reading from the device location
//! sensor. Fixes are transient: they are validated on arrival, consumed by
//! the tracker, and never persisted.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::coord::{CoordError, Coordinate};

/// Default staleness bound for incoming fixes.
///
/// A fix older than this is treated as "no better information" rather than
/// a fresh authoritative position and is discarded before it reaches the
/// tracker.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(30);

/// One timestamped GPS coordinate reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    location: Coordinate,
    timestamp: DateTime<Utc>,
}

impl Fix {
    /// Create a fix from an already-validated coordinate.
    pub fn new(location: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            location,
            timestamp,
        }
    }

    /// Validate raw sensor output into a fix.
    ///
    /// # Errors
    ///
    /// Returns `FixError::InvalidCoordinate` when either component is out
    /// of range or non-finite.
    pub fn from_raw(
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, FixError> {
        let location = Coordinate::new(latitude, longitude)?;
        Ok(Self {
            location,
            timestamp,
        })
    }

    /// The fix position.
    #[inline]
    pub fn location(&self) -> Coordinate {
        self.location
    }

    /// When the sensor produced this fix.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Age of this fix relative to `now`.
    ///
    /// A fix timestamped in the future (clock skew between sensor and host)
    /// has zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether this fix is older than the given staleness bound.
    pub fn is_stale(&self, now: DateTime<Utc>, bound: Duration) -> bool {
        self.age(now) > bound
    }
}

/// Errors from fix validation.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    /// The reported position is out of range or non-finite.
    #[error("invalid fix coordinate: {0}")]
    InvalidCoordinate(#[from] CoordError),

    /// The datagram carried no usable timestamp.
    #[error("fix is missing a timestamp")]
    MissingTimestamp,
}
