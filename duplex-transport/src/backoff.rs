use std::time::Duration;

/// Exponential backoff with a hard ceiling (spec §4.1: initial 200ms,
/// max 30000ms).
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_ms: u64,
    max_ms: u64,
    current_ms: u64,
}

impl Backoff {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_ms,
            max_ms,
            current_ms: initial_ms,
        }
    }

    /// Returns the delay to wait before the next attempt, then doubles
    /// the stored delay (capped at `max_ms`) for the attempt after that.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms;
        self.current_ms = (self.current_ms.saturating_mul(2)).min(self.max_ms);
        Duration::from_millis(delay)
    }

    pub fn reset(&mut self) {
        self.current_ms = self.initial_ms;
    }
}

#[cfg(test)]
#[path = "backoff.test.rs"]
mod tests;
