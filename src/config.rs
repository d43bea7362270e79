//! Run configuration
//!
//! Built by the binary from command-line flags (with environment fallbacks)
//! and validated before any probing starts. Validation failures are the only
//! fatal errors of a run.

use crate::batch::{BatchConfig, IdentifierSource};
use crate::probe::{ProbeConfig, DEFAULT_TARGET_URL, DEFAULT_TIMEOUT_SECS};
use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default pause between identifiers in seconds
pub const DEFAULT_DELAY_SECS: f64 = 0.5;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Single identifier to check
    pub identifier: Option<String>,
    /// File with one identifier per line
    pub identifier_file: Option<PathBuf>,
    /// Append confirmed identifiers here
    pub output: Option<PathBuf>,
    /// Proxy list; absent means direct connection only
    pub proxy_file: Option<PathBuf>,
    /// Pause between identifiers, in seconds
    pub delay_secs: f64,
    /// Per-attempt timeout, in seconds
    pub timeout_secs: u64,
    /// Identity endpoint URL
    pub target_url: String,
    /// Identifiers processed at once
    pub concurrency: usize,
    /// Debug-level diagnostics including response excerpts
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identifier: None,
            identifier_file: None,
            output: None,
            proxy_file: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            target_url: DEFAULT_TARGET_URL.to_string(),
            concurrency: 1,
            verbose: false,
        }
    }
}

impl Config {
    /// Check the configuration for errors that must stop the run.
    pub fn validate(&self) -> Result<()> {
        match (&self.identifier, &self.identifier_file) {
            (None, None) => {
                return Err(Error::Config(
                    "specify either a single identifier or an identifier file".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "a single identifier and an identifier file are mutually exclusive".to_string(),
                ))
            }
            _ => {}
        }

        if let Some(path) = &self.identifier_file {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "identifier file not found: {}",
                    path.display()
                )));
            }
        }
        if let Some(path) = &self.proxy_file {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "proxy file not found: {}",
                    path.display()
                )));
            }
        }
        if self.delay_secs < 0.0 || Duration::try_from_secs_f64(self.delay_secs).is_err() {
            return Err(Error::Config(format!(
                "delay must be a non-negative number of seconds, got {}",
                self.delay_secs
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout must be at least one second".to_string()));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if reqwest::Url::parse(&self.target_url).is_err() {
            return Err(Error::Config(format!("invalid target URL: {}", self.target_url)));
        }
        Ok(())
    }

    pub fn identifier_source(&self) -> Result<IdentifierSource> {
        match (&self.identifier, &self.identifier_file) {
            (_, Some(path)) => Ok(IdentifierSource::File(path.clone())),
            (Some(identifier), None) => Ok(IdentifierSource::Single(identifier.clone())),
            (None, None) => Err(Error::Config("no identifier source configured".to_string())),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or_default()
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::new()
            .with_target_url(self.target_url.clone())
            .with_timeout(self.timeout())
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new()
            .with_delay(self.delay())
            .with_concurrency(self.concurrency)
    }
}
