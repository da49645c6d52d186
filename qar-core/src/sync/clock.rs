use std::sync::atomic::{AtomicU64, Ordering};

/// Lamport clock shared by all tables of one session replica.
///
/// `tick` stamps a local mutation; `observe` folds in the clock of every
/// remote op so later local stamps sort after everything already seen.
#[derive(Debug, Default)]
pub struct LamportClock {
    counter: AtomicU64,
}

impl LamportClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock for a local event and return the new value.
    pub fn tick(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Fold a remotely observed clock value into the local one.
    pub fn observe(&self, remote: u64) {
        self.counter.fetch_max(remote, Ordering::AcqRel);
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_is_strictly_increasing() {
        let clock = LamportClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(b > a);
    }

    #[test]
    fn test_observe_advances_past_remote() {
        let clock = LamportClock::new();
        clock.tick();
        clock.observe(100);
        assert!(clock.tick() > 100);
    }

    #[test]
    fn test_observe_never_rewinds() {
        let clock = LamportClock::new();
        clock.observe(50);
        clock.observe(10);
        assert_eq!(clock.current(), 50);
    }
}
