//! Batch module: feeds identifiers to the rotation controller
//!
//! This module provides functionality for:
//! - Reading identifiers lazily from a file or the command line
//! - Running jobs sequentially or over a bounded number of workers
//! - Appending confirmed identifiers to a result file as soon as they are known

pub mod driver;
pub mod sink;
pub mod source;

pub use driver::{BatchConfig, BatchDriver, BatchSummary};
pub use sink::ResultSink;
pub use source::{IdentifierSource, Identifiers};
