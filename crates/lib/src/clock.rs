//! Time provider abstraction and mutation deadlines
//!
//! This module provides a [`Clock`] trait that abstracts over time sources,
//! allowing production code to use real system time while tests can use
//! controllable time. The engine reads the clock only to evaluate
//! caller-supplied [`Deadline`]s.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use canopy::{Clock, Deadline, SystemClock};
//!
//! let clock = SystemClock;
//! let deadline = Deadline::after(&clock, Duration::from_secs(5));
//! assert!(!deadline.has_passed(&clock));
//! ```

use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Production clock using real system time.
///
/// This is the default clock implementation used in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Absolute point in time after which a mutation must not start writing.
///
/// Deadlines are honored while a mutation is validating or reserving. Once
/// the write to the Node Store has begun they are ignored, because a write
/// either commits fully or fails on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    at_millis: u64,
}

impl Deadline {
    /// A deadline at an absolute time in milliseconds since Unix epoch.
    pub fn at(at_millis: u64) -> Self {
        Self { at_millis }
    }

    /// A deadline `timeout` from now according to `clock`.
    pub fn after(clock: &dyn Clock, timeout: Duration) -> Self {
        let timeout = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Self::at(clock.now_millis().saturating_add(timeout))
    }

    pub fn at_millis(&self) -> u64 {
        self.at_millis
    }

    /// True once `clock` reads a time at or after the deadline.
    pub fn has_passed(&self, clock: &dyn Clock) -> bool {
        clock.now_millis() >= self.at_millis
    }
}

/// Test clock with manual control.
///
/// The clock stands still unless advanced explicitly, or unless it was built
/// with [`FixedClock::stepping`], in which case every read moves it forward
/// by a fixed step. Stepping clocks let tests expire a deadline between two
/// phases of one mutation.
///
/// # Example
///
/// ```
/// use canopy::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1000);
/// assert_eq!(clock.now_millis(), 1000);
/// clock.advance(500);
/// assert_eq!(clock.now_millis(), 1500);
///
/// let stepping = FixedClock::stepping(0, 10);
/// assert_eq!(stepping.now_millis(), 0);
/// assert_eq!(stepping.now_millis(), 10);
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    state: Mutex<FixedClockState>,
}

#[cfg(any(test, feature = "testing"))]
struct FixedClockState {
    millis: u64,
    step: u64,
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a clock frozen at the given time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self::stepping(millis, 0)
    }

    /// Create a clock that advances by `step` milliseconds after every read.
    pub fn stepping(millis: u64, step: u64) -> Self {
        Self {
            state: Mutex::new(FixedClockState { millis, step }),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: u64) {
        self.state.lock().unwrap().millis += ms;
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.state.lock().unwrap().millis = ms;
    }

    /// Get the current time without stepping.
    pub fn get(&self) -> u64 {
        self.state.lock().unwrap().millis
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        let t = state.millis;
        state.millis += state.step;
        t
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("FixedClock")
            .field("millis", &state.millis)
            .field("step", &state.step)
            .finish()
    }
}
