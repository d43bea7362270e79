//! Proxy module: endpoint model, list parsing and the candidate pool
//!
//! This module provides functionality for:
//! - Parsing proxies from newline-delimited lists in several formats
//! - Deduplicating them into an ordered pool used round-robin by the
//!   rotation controller

pub mod models;
pub mod parser;
pub mod pool;

pub use models::{Endpoint, ProxyAuth, Scheme};
pub use parser::{LineError, ProxyParser};
pub use pool::ProxyPool;
