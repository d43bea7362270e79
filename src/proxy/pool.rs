//! Ordered, deduplicated proxy pool
//!
//! The pool itself is immutable once loaded. Health (blacklist flags and the
//! round-robin cursor) lives with the rotation controller.

use crate::proxy::models::{Endpoint, Scheme};
use crate::proxy::parser::ProxyParser;
use crate::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Ordered collection of candidate endpoints. An empty pool means
/// "direct connection only".
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    endpoints: Vec<Endpoint>,
}

impl ProxyPool {
    /// Build a pool, dropping duplicates by `(host, port, scheme)` while
    /// keeping first-occurrence order.
    pub fn from_endpoints(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        let mut seen = HashSet::new();
        let endpoints = endpoints
            .into_iter()
            .filter(|endpoint| seen.insert(endpoint.clone()))
            .collect();
        Self { endpoints }
    }

    /// Pool with no endpoints
    pub fn direct_only() -> Self {
        Self::default()
    }

    /// Load a pool from a proxy list file.
    ///
    /// A missing file is a configuration error; malformed lines are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let parsed = ProxyParser::parse_file(path, Scheme::Http).map_err(|e| {
            Error::Config(format!("cannot read proxy file {}: {}", path.display(), e))
        })?;
        let parsed_count = parsed.len();
        let pool = Self::from_endpoints(parsed);

        if parsed_count > pool.size() {
            info!(duplicates = parsed_count - pool.size(), "dropped duplicate proxies");
        }
        if pool.is_empty() {
            warn!("No valid proxies loaded from {}, continuing without proxy", path.display());
        } else {
            info!("Loaded {} proxies from {}", pool.size(), path.display());
        }

        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoint at `index`, wrapping around the pool size.
    ///
    /// # Panics
    ///
    /// Panics if the pool is empty.
    pub fn at(&self, index: usize) -> &Endpoint {
        &self.endpoints[index % self.endpoints.len()]
    }
}
