//! Probe module: one identity check through one route
//!
//! The executor is a single-attempt classifier. It turns a network exchange
//! into a [`ProbeOutcome`] and leaves every retry and rotation decision to the
//! rotation controller.

pub mod executor;
pub mod outcome;

pub use executor::{HttpProbeExecutor, ProbeConfig, ProbeExecutor, DEFAULT_TARGET_URL, DEFAULT_TIMEOUT_SECS};
pub use outcome::{classify, ProbeOutcome};
