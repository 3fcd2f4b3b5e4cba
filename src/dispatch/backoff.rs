use std::time::Duration;

use crate::config::PollConfig;

/// Wait-interval state for the queue polling loop.
///
/// The interval only ever moves two ways: up by one step after a quiet
/// poll (saturating at the cap) or back down to the reset value when the
/// queue listing changes. It never decreases otherwise.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    config: PollConfig,
    current: Duration,
}

impl PollBackoff {
    pub fn new(config: PollConfig) -> Self {
        let current = config.first_wait;
        Self { config, current }
    }

    /// The wait to use before the next poll.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// The listing was unchanged; grow the interval, capped.
    pub fn quiet(&mut self) {
        self.current = (self.current + self.config.step).min(self.config.max_wait);
    }

    /// The listing changed; snap back to the short interval.
    pub fn changed(&mut self) {
        self.current = self.config.reset_wait;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn starts_at_first_wait() {
        let backoff = PollBackoff::new(PollConfig::default());
        assert_eq!(backoff.current(), secs(7));
    }

    #[test]
    fn grows_by_step_while_quiet() {
        let mut backoff = PollBackoff::new(PollConfig::default());
        backoff.quiet();
        assert_eq!(backoff.current(), secs(8));
        backoff.quiet();
        assert_eq!(backoff.current(), secs(9));
    }

    #[test]
    fn never_exceeds_cap() {
        let mut backoff = PollBackoff::new(PollConfig::default());
        for _ in 0..100 {
            backoff.quiet();
            assert!(backoff.current() <= secs(30));
        }
        assert_eq!(backoff.current(), secs(30));
    }

    #[test]
    fn change_resets_to_short_interval() {
        let mut backoff = PollBackoff::new(PollConfig::default());
        for _ in 0..10 {
            backoff.quiet();
        }
        backoff.changed();
        assert_eq!(backoff.current(), secs(3));
    }

    #[test]
    fn never_decreases_without_a_change() {
        let mut backoff = PollBackoff::new(PollConfig::default());
        let mut last = backoff.current();
        for _ in 0..50 {
            backoff.quiet();
            assert!(backoff.current() >= last);
            last = backoff.current();
        }
    }
}
