// crates/summit-core/src/clock.rs
//
// Injected clock capability. The round clock and the randomness source read
// time only through this trait so that tests advance a fake clock instead of
// waiting for real seconds or mining real blocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time source for round scheduling and commit-reveal gating.
pub trait Clock: Send + Sync {
    /// Current unix timestamp in seconds.
    fn now(&self) -> u64;

    /// An opaque, monotonically advancing block-like marker mixed into the
    /// resolved seed. On-chain this is the block height; the system clock
    /// implementation derives it from the timestamp.
    fn block_marker(&self) -> u64;
}

/// Wall-clock implementation backed by `SystemTime`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn block_marker(&self) -> u64 {
        self.now()
    }
}

/// Manually advanced clock for deterministic tests.
pub struct FakeClock {
    now: AtomicU64,
}

impl FakeClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Advance the clock by `secs` seconds.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute timestamp. Never moves backwards.
    pub fn set(&self, ts: u64) {
        self.now.fetch_max(ts, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn block_marker(&self) -> u64 {
        self.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_advance() {
        let clock = FakeClock::new(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance(60);
        assert_eq!(clock.now(), 1_060);
    }

    #[test]
    fn test_fake_clock_set_never_rewinds() {
        let clock = FakeClock::new(1_000);
        clock.set(500);
        assert_eq!(clock.now(), 1_000);
        clock.set(2_000);
        assert_eq!(clock.now(), 2_000);
    }

    #[test]
    fn test_system_clock_is_nonzero() {
        let clock = SystemClock;
        assert!(clock.now() > 0);
        assert_eq!(clock.now(), clock.block_marker());
    }
}
