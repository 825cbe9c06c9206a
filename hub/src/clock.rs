//! Epoch millisecond timestamps.
//!
//! The state machine takes every clock reading as an explicit argument so
//! tests can drive timers without waiting on wall time.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct EpochMillis(pub i64);

impl EpochMillis {
    /// Creates an EpochMillis from milliseconds.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// Returns the current wall-clock time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(duration.as_millis() as i64)
    }

    /// Converts to milliseconds.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the difference `self - other` in milliseconds.
    pub const fn diff(&self, other: EpochMillis) -> i64 {
        self.0 - other.0
    }
}

impl std::ops::Add<i64> for EpochMillis {
    type Output = Self;
    fn add(self, rhs: i64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::Sub<i64> for EpochMillis {
    type Output = Self;
    fn sub(self, rhs: i64) -> Self::Output {
        Self(self.0 - rhs)
    }
}
