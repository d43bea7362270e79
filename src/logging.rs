//! Logging initialization.
//!
//! Diagnostics go to stderr so stdout carries only the per-identifier status
//! lines.

use std::io;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the global subscriber. `RUST_LOG` takes precedence over
/// `verbose`.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "info");
        assert_eq!(default_directive(true), "debug");
    }
}
