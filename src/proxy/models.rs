//! Endpoint data models

use std::fmt;
use std::hash::{Hash, Hasher};

/// Forward-proxy connection scheme.
///
/// Only schemes the HTTP client can route through are representable;
/// `socks4` lines are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
    Socks5,
}

impl Scheme {
    /// Parse a URL scheme name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            "socks5" => Some(Scheme::Socks5),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
            Scheme::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Proxy authentication credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl ProxyAuth {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

/// A forward proxy usable as the route of one probe attempt.
///
/// Identity is `(host, port, scheme)`; credentials do not take part in
/// equality or hashing.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    pub auth: Option<ProxyAuth>,
}

impl Endpoint {
    /// Create a new endpoint without authentication
    pub fn new(host: impl Into<String>, port: u16, scheme: Scheme) -> Self {
        Self {
            host: host.into(),
            port,
            scheme,
            auth: None,
        }
    }

    /// Create a new endpoint with authentication
    pub fn with_auth(
        host: impl Into<String>,
        port: u16,
        scheme: Scheme,
        username: String,
        password: String,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            scheme,
            auth: Some(ProxyAuth::new(username, password)),
        }
    }

    /// Proxy URL including credentials, suitable for the HTTP client
    pub fn url(&self) -> String {
        let auth_part = self.auth.as_ref().map_or(String::new(), |auth| {
            format!("{}:{}@", auth.username, auth.password)
        });

        format!("{}://{}{}:{}", self.scheme, auth_part, self.host, self.port)
    }

    /// Proxy URL without credentials, safe to print in logs
    pub fn display_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port && self.scheme == other.scheme
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
        self.scheme.hash(state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_url())
    }
}
