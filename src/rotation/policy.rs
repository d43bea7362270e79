//! Tunable retry and rotation policy

use std::time::Duration;

/// Attempts against one endpoint before rotating away from it
pub const DEFAULT_ATTEMPTS_PER_ENDPOINT: u32 = 3;

/// Endpoint turns allowed per job when no proxy pool is loaded
pub const DEFAULT_DIRECT_TURN_BUDGET: usize = 10;

/// Policy constants for the rotation state machine.
///
/// The defaults were tuned empirically against a forgiving endpoint and are
/// not part of any contract.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Same-endpoint attempts per turn for transport errors and ambiguous
    /// responses
    pub attempts_per_endpoint: u32,
    /// Fixed backoff before retrying after a transport error
    pub transport_backoff: Duration,
    /// Fixed backoff before retrying after an ambiguous response
    pub ambiguous_backoff: Duration,
    /// Pause after every endpoint was blacklisted and the flags were cleared
    pub exhaustion_pause: Duration,
    /// Pause between turns when running without proxies
    pub direct_turn_pause: Duration,
    /// Turns per job as a multiple of the pool size
    pub turns_per_endpoint: usize,
    /// Turn budget when the pool is empty
    pub direct_turn_budget: usize,
    /// Emit a progress line every this many rotations within a job
    pub progress_every: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            attempts_per_endpoint: DEFAULT_ATTEMPTS_PER_ENDPOINT,
            transport_backoff: Duration::from_millis(500),
            ambiguous_backoff: Duration::from_secs(1),
            exhaustion_pause: Duration::from_secs(5),
            direct_turn_pause: Duration::from_secs(3),
            turns_per_endpoint: 2,
            direct_turn_budget: DEFAULT_DIRECT_TURN_BUDGET,
            progress_every: 10,
        }
    }
}

impl RotationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same policy with every pause removed
    pub fn without_delays(mut self) -> Self {
        self.transport_backoff = Duration::ZERO;
        self.ambiguous_backoff = Duration::ZERO;
        self.exhaustion_pause = Duration::ZERO;
        self.direct_turn_pause = Duration::ZERO;
        self
    }

    /// Endpoint turns a job may take before the direct fallback
    pub fn turn_budget(&self, pool_size: usize) -> usize {
        if pool_size == 0 {
            self.direct_turn_budget
        } else {
            pool_size * self.turns_per_endpoint
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_budget() {
        let policy = RotationPolicy::default();
        assert_eq!(policy.turn_budget(0), 10);
        assert_eq!(policy.turn_budget(1), 2);
        assert_eq!(policy.turn_budget(7), 14);
    }

    #[test]
    fn test_without_delays_keeps_counts() {
        let policy = RotationPolicy::default().without_delays();
        assert_eq!(policy.attempts_per_endpoint, 3);
        assert_eq!(policy.exhaustion_pause, Duration::ZERO);
        assert_eq!(policy.transport_backoff, Duration::ZERO);
    }
}
