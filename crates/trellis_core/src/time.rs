//! Time sources.
//!
//! [`Clock`] wraps a [`ClockProvider`] so the machine can stamp transition
//! records without reading the wall clock directly. Tests swap in a
//! `MockClock` to get deterministic timestamps.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//! use trellis_core::{Clock, ClockProvider};
//!
//! // A host clock frozen at the start of the current frame.
//! struct FrameClock(Instant);
//!
//! impl ClockProvider for FrameClock {
//!     fn now(&self) -> Instant {
//!         self.0
//!     }
//! }
//!
//! let clock = Clock::with_provider(Arc::new(FrameClock(Instant::now())));
//! let before = clock.now();
//! assert_eq!(clock.elapsed_since(before), Duration::ZERO);
//! ```
//!
//! With the `test-utils` feature, `MockClock` is a ready-made provider
//! that tests can advance by hand.

use core::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ─────────────────────────────────────────────────────────────────────────────
// ClockProvider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for providing current time.
///
/// Implement this for custom time providers (e.g., a host's frame clock).
pub trait ClockProvider: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// System clock provider using `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
struct SystemClock;

impl ClockProvider for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clock
// ─────────────────────────────────────────────────────────────────────────────

/// Time provider handle.
///
/// Uses the system clock by default. Cloning is cheap and clones share the
/// same provider.
#[derive(Clone)]
pub struct Clock {
    provider: Arc<dyn ClockProvider>,
}

impl Clock {
    /// Creates a clock backed by the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self {
            provider: Arc::new(SystemClock),
        }
    }

    /// Creates a clock with a custom provider.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn ClockProvider>) -> Self {
        Self { provider }
    }

    /// Returns the current instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.provider.now()
    }

    /// Returns the duration elapsed since the given instant.
    ///
    /// Saturates to zero if `earlier` is in the future.
    #[must_use]
    pub fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MockClock for Testing
// ─────────────────────────────────────────────────────────────────────────────

/// Mock clock for testing with controllable time.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockClock {
    current: parking_lot::RwLock<Instant>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockClock {
    /// Creates a mock clock set to the given instant.
    #[must_use]
    pub fn new(start: Instant) -> Self {
        Self {
            current: parking_lot::RwLock::new(start),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.write() += duration;
    }

    /// Sets the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        *self.current.write() = instant;
    }

    /// Returns the current instant.
    #[must_use]
    pub fn current(&self) -> Instant {
        *self.current.read()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl ClockProvider for MockClock {
    fn now(&self) -> Instant {
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = Clock::default();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn mock_clock_advances() {
        let start = Instant::now();
        let mock = Arc::new(MockClock::new(start));
        let clock = Clock::with_provider(mock.clone());

        assert_eq!(clock.now(), start);
        mock.advance(Duration::from_millis(250));
        assert_eq!(clock.elapsed_since(start), Duration::from_millis(250));
    }

    #[test]
    fn elapsed_since_future_saturates() {
        let start = Instant::now();
        let mock = Arc::new(MockClock::new(start));
        let clock = Clock::with_provider(mock.clone());

        let later = start + Duration::from_secs(5);
        assert_eq!(clock.elapsed_since(later), Duration::ZERO);
    }

    #[test]
    fn clones_share_provider() {
        let start = Instant::now();
        let mock = Arc::new(MockClock::new(start));
        let clock = Clock::with_provider(mock.clone());
        let copy = clock.clone();

        mock.set(start + Duration::from_secs(1));
        assert_eq!(clock.now(), copy.now());
    }
}
