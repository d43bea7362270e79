//! Pool health and the per-job transition function
//!
//! Everything here is synchronous and deterministic. The controller applies
//! the effects (sleeps, network attempts) around it.

use crate::probe::ProbeOutcome;
use crate::rotation::policy::RotationPolicy;
use std::time::Duration;

/// Endpoint picked by the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    /// The pool was exhausted and every blacklist flag was cleared to get here
    pub reset: bool,
}

/// Round-robin cursor and blacklist flags shared by every job of a run.
///
/// Callers keep this behind a single lock so that "check then mutate"
/// sequences are applied atomically.
#[derive(Debug, Clone)]
pub struct PoolHealth {
    cursor: usize,
    blacklisted: Vec<bool>,
}

impl PoolHealth {
    /// Fresh state: all endpoints healthy, cursor on the first one
    pub fn new(size: usize) -> Self {
        Self {
            cursor: 0,
            blacklisted: vec![false; size],
        }
    }

    pub fn size(&self) -> usize {
        self.blacklisted.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of endpoints not currently blacklisted
    pub fn working(&self) -> usize {
        self.blacklisted.iter().filter(|flag| !**flag).count()
    }

    /// Endpoint for a job that is starting: the cursor itself when healthy,
    /// otherwise the next healthy one.
    pub fn select(&mut self) -> Option<Selection> {
        if self.size() == 0 {
            return None;
        }
        if !self.blacklisted[self.cursor] {
            return Some(Selection {
                index: self.cursor,
                reset: false,
            });
        }
        self.rotate(None)
    }

    /// Optionally blacklist `blacklist`, then advance the cursor by at least
    /// one step to the next healthy endpoint.
    ///
    /// When every endpoint is blacklisted all flags are cleared and the cursor
    /// stays one step ahead of where it was.
    pub fn rotate(&mut self, blacklist: Option<usize>) -> Option<Selection> {
        let size = self.size();
        if size == 0 {
            return None;
        }
        if let Some(index) = blacklist {
            self.blacklisted[index % size] = true;
        }

        let start = (self.cursor + 1) % size;
        for step in 0..size {
            let index = (start + step) % size;
            if !self.blacklisted[index] {
                self.cursor = index;
                return Some(Selection { index, reset: false });
            }
        }

        self.blacklisted.fill(false);
        self.cursor = start;
        Some(Selection {
            index: start,
            reset: true,
        })
    }
}

/// Per-job state of the rotation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Attempting on `endpoint` (`None` = direct) after `failures` failed tries
    Trying { endpoint: Option<usize>, failures: u32 },
    /// Leaving the current endpoint, blacklisting it first if asked
    Rotating { blacklist: bool },
    /// Every endpoint was blacklisted and the pool has just been reset
    Exhausted { endpoint: usize },
    /// A confirmed answer was obtained
    Resolved { exists: bool },
}

/// What the controller should do after an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Resolve { exists: bool },
    Retry { backoff: Duration },
    Rotate { blacklist: bool },
}

/// Decide the next step given the outcome of an attempt that followed
/// `failures` failed attempts on the same endpoint.
pub fn transition(failures: u32, outcome: ProbeOutcome, policy: &RotationPolicy) -> Transition {
    let exhausted_here = failures + 1 >= policy.attempts_per_endpoint;
    match outcome {
        ProbeOutcome::Confirmed(exists) => Transition::Resolve { exists },
        ProbeOutcome::Throttled => Transition::Rotate { blacklist: false },
        ProbeOutcome::TransportError if exhausted_here => Transition::Rotate { blacklist: true },
        ProbeOutcome::TransportError => Transition::Retry {
            backoff: policy.transport_backoff,
        },
        ProbeOutcome::AmbiguousResponse if exhausted_here => Transition::Rotate { blacklist: false },
        ProbeOutcome::AmbiguousResponse => Transition::Retry {
            backoff: policy.ambiguous_backoff,
        },
    }
}

impl JobState {
    /// Apply an outcome to a `Trying` state. Other states are returned as is.
    pub fn on_outcome(self, outcome: ProbeOutcome, policy: &RotationPolicy) -> (JobState, Transition) {
        match self {
            JobState::Trying { endpoint, failures } => {
                let step = transition(failures, outcome, policy);
                let next = match step {
                    Transition::Resolve { exists } => JobState::Resolved { exists },
                    Transition::Retry { .. } => JobState::Trying {
                        endpoint,
                        failures: failures + 1,
                    },
                    Transition::Rotate { blacklist } => JobState::Rotating { blacklist },
                };
                (next, step)
            }
            other => (other, Transition::Rotate { blacklist: false }),
        }
    }
}
