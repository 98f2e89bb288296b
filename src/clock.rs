//! A source of "now", injectable so the cache's freshness checks can be
//! driven deterministically in tests.

use std::time::Instant;

/// A source of monotonic time.
///
/// Production code uses [`SystemClock`]; tests use a fake that can be
/// advanced by hand without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock, backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeClock;

#[cfg(any(test, feature = "test-util"))]
mod fake {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// A clock whose `now()` only changes when [`FakeClock::advance`] is
    /// called. Useful for testing TTL expiry without real sleeps.
    pub struct FakeClock {
        now: Mutex<Instant>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }
}
