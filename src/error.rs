//! Error types shared by the library.

use thiserror::Error;

/// Library error.
///
/// Probe failures are not errors: they are [`crate::ProbeOutcome`] values fed
/// to the rotation state machine. Only configuration, I/O and shutdown surface
/// here.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration, detected before any probing starts.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The shutdown token fired while work was in flight.
    #[error("cancelled by shutdown signal")]
    Cancelled,
}

/// Library result type
pub type Result<T> = std::result::Result<T, Error>;
