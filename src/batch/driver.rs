//! Batch driver: runs identifier jobs and persists confirmed results

use crate::batch::sink::ResultSink;
use crate::rotation::{Disposition, JobReport, RotationController};
use crate::shutdown::sleep_or_cancel;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Default pause between identifiers in milliseconds
const DEFAULT_DELAY_MS: u64 = 500;

/// Default number of identifiers processed at once
const DEFAULT_CONCURRENCY: usize = 1;

/// Configuration for the batch driver
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause after every identifier
    pub delay: Duration,
    /// Identifiers in flight at once; 1 processes them in input order
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Totals for one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed: usize,
    pub valid: usize,
    pub invalid: usize,
    pub unresolved: usize,
    /// The run stopped early on a shutdown signal
    pub interrupted: bool,
}

impl BatchSummary {
    fn start(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            valid: 0,
            invalid: 0,
            unresolved: 0,
            interrupted: false,
        }
    }

    fn record(&mut self, report: &JobReport) {
        self.processed += 1;
        match report.disposition {
            Disposition::Valid => self.valid += 1,
            Disposition::Invalid => self.invalid += 1,
            Disposition::Unresolved => self.unresolved += 1,
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// One-line JSON record of the run, logged when the batch ends
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Sequences identifier jobs over a shared rotation controller.
pub struct BatchDriver<W: Write = File> {
    controller: Arc<RotationController>,
    config: BatchConfig,
    sink: Option<ResultSink<W>>,
}

impl BatchDriver<File> {
    /// Driver without a result sink
    pub fn new(controller: Arc<RotationController>, config: BatchConfig) -> Self {
        Self {
            controller,
            config,
            sink: None,
        }
    }
}

impl<W: Write + Send> BatchDriver<W> {
    /// Persist every `VALID` identifier to `sink`
    pub fn with_sink<S: Write + Send>(self, sink: ResultSink<S>) -> BatchDriver<S> {
        BatchDriver {
            controller: self.controller,
            config: self.config,
            sink: Some(sink),
        }
    }

    pub fn into_sink(self) -> Option<ResultSink<W>> {
        self.sink
    }

    /// Process every identifier until the source ends or `cancel` fires.
    ///
    /// Status lines go to stdout as each job finishes. With concurrency above
    /// one, their order follows completion rather than input.
    pub async fn run<I>(&self, identifiers: I, cancel: &CancellationToken) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = String>,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("batch", run_id = %run_id);
        self.run_batch(identifiers, cancel, run_id).instrument(span).await
    }

    async fn run_batch<I>(
        &self,
        identifiers: I,
        cancel: &CancellationToken,
        run_id: Uuid,
    ) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = String>,
    {
        let mut summary = BatchSummary::start(run_id);
        let pool_size = self.controller.pool().size();
        if pool_size > 0 {
            info!(
                "Processing with {:?} delay between requests with {} proxies (auto-rotation on throttle/error)",
                self.config.delay, pool_size
            );
        } else {
            info!("Processing with {:?} delay between requests", self.config.delay);
        }

        // Leaving this block drops the stream and abandons jobs still in flight.
        {
            let jobs = stream::iter(identifiers)
                .map(|identifier| self.process(identifier, cancel))
                .buffer_unordered(self.config.concurrency.max(1));
            futures::pin_mut!(jobs);

            while let Some(result) = jobs.next().await {
                match result {
                    Ok(report) => summary.record(&report),
                    Err(Error::Cancelled) => {
                        summary.interrupted = true;
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if let Some(sink) = &self.sink {
            sink.flush()?;
        }
        summary.finished_at = Some(Utc::now());

        if summary.interrupted {
            warn!(processed = summary.processed, "batch interrupted");
        }
        info!(
            processed = summary.processed,
            valid = summary.valid,
            invalid = summary.invalid,
            unresolved = summary.unresolved,
            elapsed_ms = summary.elapsed().num_milliseconds(),
            "batch finished"
        );
        match summary.to_json() {
            Ok(json) => debug!(summary = %json, "batch summary"),
            Err(e) => debug!(error = %e, "cannot serialize batch summary"),
        }
        Ok(summary)
    }

    async fn process(&self, identifier: String, cancel: &CancellationToken) -> Result<JobReport> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let report = self.controller.run(&identifier, cancel).await?;
        println!("{}", report.status_line());
        debug!(
            identifier = %report.identifier,
            disposition = %report.disposition,
            attempts = report.attempts,
            rotations = report.rotations,
            "job finished"
        );

        if report.disposition == Disposition::Valid {
            if let Some(sink) = &self.sink {
                sink.record(&report.identifier)?;
            }
        }

        // The result is already persisted; an interrupted pause only stops
        // the next job from starting.
        if sleep_or_cancel(self.config.delay, cancel).await.is_err() {
            debug!("pacing delay interrupted");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutcome;
    use crate::rotation::RotationPolicy;
    use crate::testing::{pool, ScriptedExecutor};
    use std::collections::BTreeSet;

    fn controller(size: usize, executor: Arc<ScriptedExecutor>) -> Arc<RotationController> {
        Arc::new(RotationController::new(
            pool(size),
            executor,
            RotationPolicy::default().without_delays(),
            Duration::from_secs(1),
        ))
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn config(concurrency: usize) -> BatchConfig {
        BatchConfig::new()
            .with_delay(Duration::ZERO)
            .with_concurrency(concurrency)
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.delay, Duration::from_millis(DEFAULT_DELAY_MS));
        assert_eq!(config.concurrency, 1);
        assert_eq!(BatchConfig::new().with_concurrency(0).concurrency, 1);
    }

    #[tokio::test]
    async fn test_sequential_run_persists_only_valid() {
        let executor = ScriptedExecutor::new(|id, _, _| match id {
            "a@x.com" => ProbeOutcome::Confirmed(true),
            "b@x.com" => ProbeOutcome::Confirmed(false),
            _ => ProbeOutcome::Throttled,
        });
        let driver = BatchDriver::new(controller(2, executor.clone()), config(1))
            .with_sink(ResultSink::new(Vec::new()));

        let summary = driver
            .run(ids(&["a@x.com", "b@x.com", "c@x.com"]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!((summary.valid, summary.invalid, summary.unresolved), (1, 1, 1));
        assert!(!summary.interrupted);
        assert!(summary.finished_at.is_some());

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["run_id"], summary.run_id.to_string());
        assert_eq!(json["valid"], 1);
        assert_eq!(json["unresolved"], 1);
        assert_eq!(json["interrupted"], false);

        // sequential mode keeps input order
        let order: Vec<String> = executor.calls().into_iter().map(|c| c.identifier).collect();
        assert_eq!(order.first().map(String::as_str), Some("a@x.com"));
        assert_eq!(order.last().map(String::as_str), Some("c@x.com"));

        let sink = driver.into_sink().unwrap();
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "a@x.com\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_delay_follows_every_identifier() {
        let executor = ScriptedExecutor::always(ProbeOutcome::Confirmed(true));
        let driver = BatchDriver::new(
            controller(1, executor),
            BatchConfig::new().with_delay(Duration::from_secs(2)),
        );
        let started = tokio::time::Instant::now();

        let summary = driver
            .run(ids(&["a@x.com", "b@x.com", "c@x.com"]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(7), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_jobs_pace_independently() {
        let executor = ScriptedExecutor::always(ProbeOutcome::Confirmed(true));
        let driver = BatchDriver::new(
            controller(1, executor),
            BatchConfig::new()
                .with_delay(Duration::from_secs(2))
                .with_concurrency(3),
        );
        let started = tokio::time::Instant::now();

        driver
            .run(ids(&["a@x.com", "b@x.com", "c@x.com"]), &CancellationToken::new())
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(4), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_concurrent_run_records_every_valid() {
        let executor = ScriptedExecutor::new(|_, _, nth| {
            if nth == 0 {
                ProbeOutcome::Throttled
            } else {
                ProbeOutcome::Confirmed(true)
            }
        });
        let identifiers: Vec<String> = (0..20).map(|i| format!("user{}@x.com", i)).collect();
        let driver = BatchDriver::new(controller(3, executor), config(4))
            .with_sink(ResultSink::new(Vec::new()));

        let summary = driver
            .run(identifiers.clone(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.valid, 20);

        let written = String::from_utf8(driver.into_sink().unwrap().into_inner()).unwrap();
        let written: BTreeSet<&str> = written.lines().collect();
        let expected: BTreeSet<&str> = identifiers.iter().map(String::as_str).collect();
        assert_eq!(written, expected);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let executor = ScriptedExecutor::always(ProbeOutcome::Confirmed(true));
        let driver = BatchDriver::new(controller(1, executor.clone()), config(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = driver.run(ids(&["a@x.com"]), &cancel).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.processed, 0);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_mid_run_keeps_earlier_results() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let executor = ScriptedExecutor::new(move |id, _, _| {
            if id == "b@x.com" {
                trigger.cancel();
            }
            ProbeOutcome::Confirmed(true)
        });
        let driver = BatchDriver::new(controller(0, executor.clone()), config(1))
            .with_sink(ResultSink::new(Vec::new()));

        let summary = driver
            .run(ids(&["a@x.com", "b@x.com", "c@x.com"]), &cancel)
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.processed, 1);
        let routes: Vec<String> = executor.calls().into_iter().map(|c| c.identifier).collect();
        assert_eq!(routes, vec!["a@x.com", "b@x.com"]);
        let sink = driver.into_sink().unwrap();
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "a@x.com\n");
    }
}
