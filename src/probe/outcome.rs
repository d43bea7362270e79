//! Probe outcomes and response classification

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static THROTTLE_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""ThrottleStatus"\s*:\s*(\d+)"#).expect("Invalid ThrottleStatus regex")
});

static IF_EXISTS_RESULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""IfExistsResult"\s*:\s*(\d+)"#).expect("Invalid IfExistsResult regex")
});

/// Result of a single probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Authoritative answer: the identifier exists (`true`) or not.
    Confirmed(bool),
    /// The endpoint reported a rate limit for this origin.
    Throttled,
    /// Connect, TLS, proxy or timeout failure.
    TransportError,
    /// Parseable response without a recognizable verdict.
    AmbiguousResponse,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Confirmed(true) => write!(f, "confirmed (exists)"),
            ProbeOutcome::Confirmed(false) => write!(f, "confirmed (absent)"),
            ProbeOutcome::Throttled => write!(f, "throttled"),
            ProbeOutcome::TransportError => write!(f, "transport error"),
            ProbeOutcome::AmbiguousResponse => write!(f, "ambiguous response"),
        }
    }
}

/// Classify a response body from the identity endpoint.
///
/// A non-zero throttle status wins over any existence flag in the same body.
pub fn classify(body: &str) -> ProbeOutcome {
    if let Some(caps) = THROTTLE_STATUS.captures(body) {
        if !caps[1].trim_start_matches('0').is_empty() {
            return ProbeOutcome::Throttled;
        }
    }

    match IF_EXISTS_RESULT.captures(body).map(|caps| caps[1].to_string()) {
        Some(flag) if flag == "0" => ProbeOutcome::Confirmed(true),
        Some(flag) if flag == "1" => ProbeOutcome::Confirmed(false),
        _ => ProbeOutcome::AmbiguousResponse,
    }
}
