//! Wall-clock budget of a learning run.

use std::time::{Duration, Instant};

/// Countdown started when the loop starts. A zero budget never expires.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    expires: Option<Instant>,
}

impl Deadline {
    pub fn from_timeout_secs(timeout_secs: u64) -> Self {
        let started = Instant::now();
        let expires = budget(timeout_secs).and_then(|t| started.checked_add(t));
        Self { started, expires }
    }

    pub fn unbounded() -> Self {
        Self::from_timeout_secs(0)
    }

    pub fn is_bounded(&self) -> bool {
        self.expires.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| Instant::now() >= at)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whole seconds left, rounded up and at least 1 while time remains.
    /// `Some(0)` once expired, `None` when unbounded.
    pub fn remaining_secs(&self) -> Option<u64> {
        let at = self.expires?;
        let now = Instant::now();
        if now >= at {
            return Some(0);
        }
        let left = at.saturating_duration_since(now);
        let secs = if left.subsec_nanos() > 0 {
            left.as_secs().saturating_add(1)
        } else {
            left.as_secs()
        };
        Some(secs.max(1))
    }

    /// The tighter of `per_call_secs` and the time left; 0 means unbounded.
    /// An expired deadline still grants one second, never an unbounded call.
    pub fn clamp_call_budget(&self, per_call_secs: u64) -> u64 {
        match (self.remaining_secs(), per_call_secs) {
            (None, secs) => secs,
            (Some(left), 0) => left.max(1),
            (Some(left), secs) => left.max(1).min(secs),
        }
    }
}

fn budget(timeout_secs: u64) -> Option<Duration> {
    (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs))
}
