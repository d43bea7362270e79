//! Proxy Probe - identity endpoint prober with adaptive proxy rotation
//!
//! Checks whether identifiers exist on a remote identity-validation endpoint,
//! spreading requests over a pool of forward proxies. Proxies that throttle or
//! fail are rotated out and an exhausted pool is reset; a direct connection is
//! the last resort.

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod proxy;
pub mod rotation;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchConfig, BatchDriver, BatchSummary, IdentifierSource, ResultSink};
pub use config::Config;
pub use error::{Error, Result};
pub use probe::{HttpProbeExecutor, ProbeConfig, ProbeExecutor, ProbeOutcome};
pub use proxy::{Endpoint, ProxyParser, ProxyPool, Scheme};
pub use rotation::{Disposition, JobReport, RotationController, RotationPolicy, Route};
