//! Fixed-window rate limit counters.
//!
//! The counter itself is pure data plus windowing arithmetic; persistence and
//! atomicity live in the store, which serializes the read-modify-write so
//! concurrent bursts from one actor cannot slip past the limit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default attempt ceiling for throttled actions.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window length in minutes.
pub const DEFAULT_WINDOW_MINUTES: i64 = 60;

/// Outcome of registering one attempt against a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The attempt is allowed; `remaining` attempts are left in the window.
    Allowed {
        /// Attempts left before the limit trips.
        remaining: u32,
    },
    /// The limit is exhausted for this window.
    Limited {
        /// How long until the window rolls over.
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    /// Whether the attempt went through.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Attempt counter for one `(actor, action)` pair within a fixed window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitCounter {
    /// Attempts observed in the current window.
    pub attempts: u32,

    /// Start of the current window.
    pub window_start: DateTime<Utc>,

    /// Time of the most recent attempt, allowed or not.
    pub last_attempt: DateTime<Utc>,
}

impl RateLimitCounter {
    /// Create a counter recording its first attempt at `now`.
    #[must_use]
    pub fn first_attempt(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 1,
            window_start: now,
            last_attempt: now,
        }
    }

    /// Register one attempt at `now` and decide whether to allow it.
    ///
    /// An elapsed window resets the counter to a fresh count of 1. Within the
    /// window, attempts past `max_attempts` are refused without incrementing,
    /// so a refused burst cannot extend the penalty.
    pub fn register(
        &mut self,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        self.last_attempt = now;

        if now - self.window_start >= window {
            self.attempts = 1;
            self.window_start = now;
            return RateLimitDecision::Allowed {
                remaining: max_attempts.saturating_sub(1),
            };
        }

        if self.attempts >= max_attempts {
            return RateLimitDecision::Limited {
                retry_after: self.window_start + window - now,
            };
        }

        self.attempts += 1;
        RateLimitDecision::Allowed {
            remaining: max_attempts.saturating_sub(self.attempts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_trips_on_fourth_attempt() {
        let start = Utc::now();
        let window = Duration::minutes(60);
        let mut counter = RateLimitCounter::first_attempt(start);

        // First attempt already counted by first_attempt; two more fit.
        assert!(counter.register(3, window, start).is_allowed());
        assert!(counter.register(3, window, start).is_allowed());

        match counter.register(3, window, start + Duration::minutes(10)) {
            RateLimitDecision::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::minutes(50));
            }
            RateLimitDecision::Allowed { .. } => panic!("fourth attempt should be limited"),
        }
        assert_eq!(counter.attempts, 3);
    }

    #[test]
    fn elapsed_window_resets_to_one() {
        let start = Utc::now();
        let window = Duration::minutes(60);
        let mut counter = RateLimitCounter::first_attempt(start);
        counter.attempts = 3;

        let later = start + Duration::minutes(61);
        assert!(counter.register(3, window, later).is_allowed());
        assert_eq!(counter.attempts, 1);
        assert_eq!(counter.window_start, later);
    }

    #[test]
    fn refused_attempts_do_not_extend_the_window() {
        let start = Utc::now();
        let window = Duration::minutes(60);
        let mut counter = RateLimitCounter::first_attempt(start);

        for _ in 0..10 {
            counter.register(1, window, start + Duration::minutes(1));
        }
        assert_eq!(counter.attempts, 1);
        assert_eq!(counter.window_start, start);
    }

    #[test]
    fn remaining_counts_down() {
        let start = Utc::now();
        let window = Duration::minutes(60);
        let mut counter = RateLimitCounter::first_attempt(start);

        assert_eq!(
            counter.register(5, window, start),
            RateLimitDecision::Allowed { remaining: 3 }
        );
        assert_eq!(
            counter.register(5, window, start),
            RateLimitDecision::Allowed { remaining: 2 }
        );
    }
}
