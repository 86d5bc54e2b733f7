//! Mock clock for testing.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::ratelimit::Clock;

/// Mock clock for testing.
///
/// Time only moves when the test moves it. Clones share the same underlying
/// time, so a clone handed to the limiter can be advanced from the test.
///
/// ```
/// use request_limiter::mocks::MockClock;
/// use request_limiter::ratelimit::Clock;
/// use chrono::{Duration, Utc};
///
/// let start = Utc::now();
/// let clock = MockClock::new(start);
/// clock.advance(Duration::seconds(10));
/// assert_eq!(clock.now(), start + Duration::seconds(10));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific time.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock();
        *time = *time + duration;
    }

    /// Set the clock to a specific time.
    pub fn set(&self, time: DateTime<Utc>) {
        *self.current_time.lock() = time;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current_time.lock()
    }
}
