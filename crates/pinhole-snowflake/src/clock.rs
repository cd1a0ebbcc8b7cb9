use jiff::{SignedDuration, Timestamp};
use std::time::Duration;

pub trait Clock: Send + Sync {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
    /// Block the calling thread until the clock reaches the target time.
    fn wait_until(&self, target: Timestamp);
}

/// Wall clock. `wait_until` parks the calling thread, so callers keep
/// targets close to now.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn wait_until(&self, target: Timestamp) {
        // Sleep through all but the final millisecond, then spin to wake up
        // right at the boundary.
        loop {
            let remaining = target.duration_since(Timestamp::now());
            if remaining <= SignedDuration::ZERO {
                return;
            }
            if remaining > SignedDuration::from_millis(1) {
                let nap = remaining - SignedDuration::from_millis(1);
                std::thread::sleep(Duration::try_from(nap).unwrap_or(Duration::from_millis(1)));
            } else {
                std::thread::yield_now();
            }
        }
    }
}
