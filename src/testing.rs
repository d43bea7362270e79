//! Test doubles shared by unit tests

use crate::probe::{ProbeExecutor, ProbeOutcome};
use crate::proxy::{Endpoint, ProxyPool, Scheme};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

type Script = dyn Fn(&str, Option<&Endpoint>, usize) -> ProbeOutcome + Send + Sync;

/// One recorded executor call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub identifier: String,
    pub endpoint: Option<Endpoint>,
}

/// Executor answering from a closure of `(identifier, route, nth attempt for
/// this identifier)`, recording every call.
pub(crate) struct ScriptedExecutor {
    script: Box<Script>,
    calls: Mutex<Vec<Call>>,
    per_identifier: Mutex<HashMap<String, usize>>,
}

impl ScriptedExecutor {
    pub fn new(
        script: impl Fn(&str, Option<&Endpoint>, usize) -> ProbeOutcome + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            per_identifier: Mutex::new(HashMap::new()),
        })
    }

    /// Always answer `outcome`
    pub fn always(outcome: ProbeOutcome) -> Arc<Self> {
        Self::new(move |_, _, _| outcome)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Hosts of the recorded calls, `"direct"` for direct attempts
    pub fn routes(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|call| {
                call.endpoint
                    .as_ref()
                    .map_or_else(|| "direct".to_string(), |e| e.host.clone())
            })
            .collect()
    }
}

#[async_trait]
impl ProbeExecutor for ScriptedExecutor {
    async fn attempt(
        &self,
        identifier: &str,
        endpoint: Option<&Endpoint>,
        _timeout: Duration,
    ) -> ProbeOutcome {
        let nth = {
            let mut counts = self.per_identifier.lock();
            let count = counts.entry(identifier.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };
        self.calls.lock().push(Call {
            identifier: identifier.to_string(),
            endpoint: endpoint.cloned(),
        });
        let outcome = (self.script)(identifier, endpoint, nth);
        // Yield so concurrent jobs interleave like real network calls.
        tokio::task::yield_now().await;
        outcome
    }
}

/// Pool of `size` endpoints with hosts `p1`, `p2`, ...
pub(crate) fn pool(size: usize) -> ProxyPool {
    ProxyPool::from_endpoints((1..=size).map(|i| Endpoint::new(format!("p{}", i), 8080, Scheme::Http)))
}

/// Formatted log output of the current thread, captured at debug level
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Capture until the returned guard is dropped
    pub fn start() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
