//! Rotation module: the proxy-rotation-and-retry state machine
//!
//! Given the outcome of each attempt, the controller decides whether to retry
//! the same endpoint, rotate to the next one, blacklist an endpoint, reset an
//! exhausted pool, or fall back to a direct connection.

pub mod controller;
pub mod policy;
pub mod state;

pub use controller::{Disposition, JobReport, RotationController, Route};
pub use policy::RotationPolicy;
pub use state::{transition, JobState, PoolHealth, Selection, Transition};
