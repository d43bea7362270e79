//! Cooperative shutdown
//!
//! A single [`CancellationToken`] is shared by every job of a run. Network
//! attempts and pauses race against it so Ctrl-C never waits out a backoff.

use crate::{Error, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Cancel `token` when the process receives Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received shutdown signal, finishing up");
                token.cancel();
            }
            Err(e) => error!(error = %e, "cannot listen for shutdown signal"),
        }
    });
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
