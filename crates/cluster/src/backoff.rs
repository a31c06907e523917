//! Restart backoff with crash-loop escalation.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use drossel_core::RestartConfig;

/// What to do after a worker crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Restart after this delay.
    Restart(Duration),
    /// Too many crashes inside the window: halt the slot.
    GiveUp,
}

/// Tracks crash times for one worker slot and decides restarts.
///
/// The delay doubles with each crash still inside the sliding window and is
/// capped at `backoff_max_ms`. Once the window holds more than
/// `max_restarts` crashes, the slot escalates to [`RestartDecision::GiveUp`]
/// instead of looping forever.
pub struct RestartBackoff {
    policy: RestartConfig,
    crashes: VecDeque<Instant>,
}

impl RestartBackoff {
    pub fn new(policy: RestartConfig) -> Self {
        Self {
            policy,
            crashes: VecDeque::new(),
        }
    }

    /// Record a crash at `now` and decide what happens next.
    pub fn on_crash(&mut self, now: Instant) -> RestartDecision {
        let window = Duration::from_secs(self.policy.window_secs);
        self.crashes.push_back(now);
        while let Some(first) = self.crashes.front() {
            if now.duration_since(*first) > window {
                self.crashes.pop_front();
            } else {
                break;
            }
        }

        let recent = self.crashes.len() as u32;
        if recent > self.policy.max_restarts {
            return RestartDecision::GiveUp;
        }

        let exponent = recent.saturating_sub(1).min(16);
        let delay = self
            .policy
            .backoff_initial_ms
            .saturating_mul(1u64 << exponent)
            .min(self.policy.backoff_max_ms);
        RestartDecision::Restart(Duration::from_millis(delay))
    }

    /// Crashes currently inside the window.
    pub fn recent_crashes(&self) -> usize {
        self.crashes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RestartConfig {
        RestartConfig {
            backoff_initial_ms: 100,
            backoff_max_ms: 1_000,
            max_restarts: 3,
            window_secs: 60,
        }
    }

    #[test]
    fn delay_doubles_up_to_the_cap() {
        let mut backoff = RestartBackoff::new(policy());
        let now = Instant::now();
        assert_eq!(
            backoff.on_crash(now),
            RestartDecision::Restart(Duration::from_millis(100))
        );
        assert_eq!(
            backoff.on_crash(now),
            RestartDecision::Restart(Duration::from_millis(200))
        );
        assert_eq!(
            backoff.on_crash(now),
            RestartDecision::Restart(Duration::from_millis(400))
        );
    }

    #[test]
    fn escalates_after_max_restarts_in_window() {
        let mut backoff = RestartBackoff::new(policy());
        let now = Instant::now();
        for _ in 0..3 {
            assert!(matches!(backoff.on_crash(now), RestartDecision::Restart(_)));
        }
        assert_eq!(backoff.on_crash(now), RestartDecision::GiveUp);
    }

    #[test]
    fn crashes_outside_the_window_age_out() {
        let mut backoff = RestartBackoff::new(policy());
        let start = Instant::now();
        for _ in 0..3 {
            backoff.on_crash(start);
        }
        // A crash long after the window expired counts as the first again.
        let later = start + Duration::from_secs(120);
        assert_eq!(
            backoff.on_crash(later),
            RestartDecision::Restart(Duration::from_millis(100))
        );
        assert_eq!(backoff.recent_crashes(), 1);
    }

    #[test]
    fn delay_is_capped() {
        let mut backoff = RestartBackoff::new(RestartConfig {
            backoff_initial_ms: 100,
            backoff_max_ms: 500,
            max_restarts: 10,
            window_secs: 60,
        });
        let now = Instant::now();
        let mut last = Duration::ZERO;
        for _ in 0..6 {
            if let RestartDecision::Restart(delay) = backoff.on_crash(now) {
                last = delay;
            }
        }
        assert_eq!(last, Duration::from_millis(500));
    }
}
