//! Rotation controller: drives one identifier job through the pool

use crate::probe::{ProbeExecutor, ProbeOutcome};
use crate::proxy::{Endpoint, ProxyPool};
use crate::rotation::policy::RotationPolicy;
use crate::rotation::state::{JobState, PoolHealth, Transition};
use crate::shutdown::sleep_or_cancel;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Final disposition of an identifier job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Valid,
    Invalid,
    Unresolved,
}

impl Disposition {
    fn confirmed(exists: bool) -> Self {
        if exists {
            Disposition::Valid
        } else {
            Disposition::Invalid
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Valid => write!(f, "VALID"),
            Disposition::Invalid => write!(f, "INVALID"),
            Disposition::Unresolved => write!(f, "UNRESOLVED"),
        }
    }
}

/// Route that produced a confirmed answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Proxy(Endpoint),
    /// Direct connection in a run without proxies
    Direct,
    /// Direct connection used as last resort after the turn budget
    Fallback,
}

/// Summary of one identifier job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub identifier: String,
    pub disposition: Disposition,
    pub route: Option<Route>,
    /// Network attempts made, including the direct fallback
    pub attempts: usize,
    /// Endpoint turns taken
    pub turns: usize,
    pub rotations: usize,
    /// Pool resets triggered by this job
    pub resets: usize,
}

impl JobReport {
    /// Human status line, e.g. `a@x.com - VALID (via http://p2:8080)`
    pub fn status_line(&self) -> String {
        match (&self.disposition, &self.route) {
            (Disposition::Unresolved, _) => {
                format!("{} - UNRESOLVED (all methods exhausted)", self.identifier)
            }
            (disposition, Some(Route::Proxy(endpoint))) => {
                format!("{} - {} (via {})", self.identifier, disposition, endpoint)
            }
            (disposition, Some(Route::Fallback)) => {
                format!("{} - {} (direct connection)", self.identifier, disposition)
            }
            (disposition, _) => format!("{} - {}", self.identifier, disposition),
        }
    }
}

#[derive(Default)]
struct Tally {
    attempts: usize,
    turns: usize,
    rotations: usize,
    resets: usize,
}

impl Tally {
    fn report(&self, identifier: &str, disposition: Disposition, route: Option<Route>) -> JobReport {
        JobReport {
            identifier: identifier.to_string(),
            disposition,
            route,
            attempts: self.attempts,
            turns: self.turns,
            rotations: self.rotations,
            resets: self.resets,
        }
    }
}

/// Owns pool health for a run and resolves identifiers one job at a time.
///
/// Jobs may run concurrently on a shared controller; every cursor move and
/// blacklist change happens under one lock.
pub struct RotationController {
    pool: ProxyPool,
    health: Mutex<PoolHealth>,
    executor: Arc<dyn ProbeExecutor>,
    policy: RotationPolicy,
    timeout: Duration,
}

impl RotationController {
    pub fn new(
        pool: ProxyPool,
        executor: Arc<dyn ProbeExecutor>,
        policy: RotationPolicy,
        timeout: Duration,
    ) -> Self {
        let health = Mutex::new(PoolHealth::new(pool.size()));
        Self {
            pool,
            health,
            executor,
            policy,
            timeout,
        }
    }

    pub fn pool(&self) -> &ProxyPool {
        &self.pool
    }

    /// Current round-robin cursor
    pub fn cursor(&self) -> usize {
        self.health.lock().cursor()
    }

    /// Endpoints not currently blacklisted
    pub fn working(&self) -> usize {
        self.health.lock().working()
    }

    /// Resolve `identifier`.
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires before a disposition is
    /// reached; every other failure ends as [`Disposition::Unresolved`].
    pub async fn run(&self, identifier: &str, cancel: &CancellationToken) -> Result<JobReport> {
        let span = info_span!("job", identifier = %identifier);
        self.run_job(identifier, cancel).instrument(span).await
    }

    async fn run_job(&self, identifier: &str, cancel: &CancellationToken) -> Result<JobReport> {
        let mut tally = Tally::default();
        let budget = self.policy.turn_budget(self.pool.size());

        let mut current = self.health.lock().select().map(|selection| selection.index);
        let mut state = JobState::Trying {
            endpoint: current,
            failures: 0,
        };
        tally.turns = 1;

        loop {
            match state {
                JobState::Trying { endpoint, .. } => {
                    let route = endpoint.map(|index| self.pool.at(index));
                    let outcome = self.attempt(identifier, route, cancel).await?;
                    tally.attempts += 1;

                    let (next, step) = state.on_outcome(outcome, &self.policy);
                    debug!(
                        route = %route.map_or_else(|| "direct".to_string(), |e| e.to_string()),
                        outcome = %outcome,
                        ?step,
                        "attempt finished"
                    );
                    if let Transition::Retry { backoff } = step {
                        sleep_or_cancel(backoff, cancel).await?;
                    }
                    state = next;
                }
                JobState::Resolved { exists } => {
                    let route = match current {
                        Some(index) => Route::Proxy(self.pool.at(index).clone()),
                        None => Route::Direct,
                    };
                    return Ok(tally.report(identifier, Disposition::confirmed(exists), Some(route)));
                }
                JobState::Rotating { blacklist } => {
                    tally.rotations += 1;
                    let Some(index) = current else {
                        // Direct-only run: pause, then take another turn.
                        if tally.turns >= budget {
                            break;
                        }
                        if tally.turns % 3 == 0 {
                            info!("Retrying (turn {}/{})", tally.turns, budget);
                        }
                        debug!(
                            turn = tally.turns,
                            "rotating direct route after {:?}",
                            self.policy.direct_turn_pause
                        );
                        sleep_or_cancel(self.policy.direct_turn_pause, cancel).await?;
                        tally.turns += 1;
                        state = JobState::Trying {
                            endpoint: None,
                            failures: 0,
                        };
                        continue;
                    };

                    let (selection, working) = {
                        let mut health = self.health.lock();
                        let selection = health.rotate(blacklist.then_some(index));
                        (selection, health.working())
                    };
                    let Some(selection) = selection else {
                        break;
                    };

                    if blacklist {
                        debug!(endpoint = %self.pool.at(index), "blacklisted after repeated transport failures");
                    }
                    debug!(
                        from = index,
                        to = selection.index,
                        reset = selection.reset,
                        endpoint = %self.pool.at(selection.index),
                        "rotated endpoint"
                    );
                    if tally.rotations % self.policy.progress_every.max(1) == 0 {
                        info!(
                            "Rotating proxies... (rotation {}, {}/{} working)",
                            tally.rotations,
                            working,
                            self.pool.size()
                        );
                    }
                    if selection.reset {
                        tally.resets += 1;
                    }
                    if tally.turns >= budget {
                        break;
                    }

                    tally.turns += 1;
                    current = Some(selection.index);
                    state = if selection.reset {
                        JobState::Exhausted {
                            endpoint: selection.index,
                        }
                    } else {
                        JobState::Trying {
                            endpoint: current,
                            failures: 0,
                        }
                    };
                }
                JobState::Exhausted { endpoint } => {
                    warn!(
                        "All proxies exhausted, clearing blacklist and retrying in {:?}",
                        self.policy.exhaustion_pause
                    );
                    sleep_or_cancel(self.policy.exhaustion_pause, cancel).await?;
                    state = JobState::Trying {
                        endpoint: Some(endpoint),
                        failures: 0,
                    };
                }
            }
        }

        warn!(
            "Could not validate after {} turns ({} attempts). Trying once more without proxy",
            tally.turns, tally.attempts
        );
        let outcome = self.attempt(identifier, None, cancel).await?;
        tally.attempts += 1;

        Ok(match outcome {
            ProbeOutcome::Confirmed(exists) => {
                tally.report(identifier, Disposition::confirmed(exists), Some(Route::Fallback))
            }
            other => {
                debug!(outcome = %other, "direct fallback inconclusive");
                tally.report(identifier, Disposition::Unresolved, None)
            }
        })
    }

    async fn attempt(
        &self,
        identifier: &str,
        endpoint: Option<&Endpoint>,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            outcome = self.executor.attempt(identifier, endpoint, self.timeout) => Ok(outcome),
        }
    }
}
