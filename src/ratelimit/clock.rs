//! Time source for request timestamps and window boundaries.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Port for obtaining the current time.
///
/// The limiter reads the clock once when recording an event and once when
/// computing a window threshold. Tests substitute
/// [`MockClock`](crate::mocks::MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation using `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_clock() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = clock.now();

        assert!(t2 > t1);
    }
}
