//! Single-attempt probe execution against the identity endpoint

use crate::probe::outcome::{classify, ProbeOutcome};
use crate::proxy::Endpoint;
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{header, Client, Proxy as ReqwestProxy};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Default identity-check endpoint
pub const DEFAULT_TARGET_URL: &str = "https://login.microsoftonline.com/common/GetCredentialType";

/// Default timeout for a single attempt in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default user agent sent with every attempt
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Length of the response excerpt logged in verbose mode
const RESPONSE_EXCERPT_CHARS: usize = 200;

/// Issues one validation attempt and classifies the result.
///
/// Implementations perform no retries and never touch pool health.
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    /// Probe `identifier` through `endpoint`, or directly when `None`.
    async fn attempt(
        &self,
        identifier: &str,
        endpoint: Option<&Endpoint>,
        timeout: Duration,
    ) -> ProbeOutcome;
}

/// Configuration for the HTTP probe executor
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// URL the identity check is posted to
    pub target_url: String,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// User agent for requests
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_url(mut self, url: String) -> Self {
        self.target_url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Probe executor speaking the JSON credential-type contract over HTTP.
pub struct HttpProbeExecutor {
    config: ProbeConfig,
    direct: Client,
    // One client per proxy so connections are reused across attempts.
    proxied: Mutex<HashMap<Endpoint, Client>>,
}

impl HttpProbeExecutor {
    pub fn with_config(config: ProbeConfig) -> Result<Self> {
        let direct = Self::client_builder(&config).no_proxy().build()?;
        Ok(Self {
            config,
            direct,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    fn client_builder(config: &ProbeConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
    }

    /// Client routed through `endpoint`, built on first use
    fn client_for(&self, endpoint: &Endpoint) -> Result<Client> {
        if let Some(client) = self.proxied.lock().get(endpoint) {
            return Ok(client.clone());
        }

        // reqwest applies http/https/socks proxies alike via `Proxy::all`,
        // and the target is https so `Proxy::http` would be bypassed.
        let proxy = ReqwestProxy::all(endpoint.url())?;
        let client = Self::client_builder(&self.config).proxy(proxy).build()?;

        self.proxied.lock().insert(endpoint.clone(), client.clone());
        Ok(client)
    }

    async fn send(&self, client: &Client, identifier: &str, timeout: Duration) -> reqwest::Result<String> {
        let body = serde_json::json!({ "Username": identifier });
        let response = client
            .post(&self.config.target_url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .timeout(timeout)
            .send()
            .await?;
        response.text().await
    }
}

#[async_trait]
impl ProbeExecutor for HttpProbeExecutor {
    async fn attempt(
        &self,
        identifier: &str,
        endpoint: Option<&Endpoint>,
        timeout: Duration,
    ) -> ProbeOutcome {
        let route = endpoint.map_or_else(|| "direct connection".to_string(), |e| e.to_string());

        let client = match endpoint {
            Some(endpoint) => match self.client_for(endpoint) {
                Ok(client) => client,
                Err(e) => {
                    debug!(identifier, route = %route, error = %e, "cannot build proxied client");
                    return ProbeOutcome::TransportError;
                }
            },
            None => self.direct.clone(),
        };

        match tokio::time::timeout(timeout, self.send(&client, identifier, timeout)).await {
            Ok(Ok(text)) => {
                let excerpt: String = text.chars().take(RESPONSE_EXCERPT_CHARS).collect();
                debug!(identifier, route = %route, response = %excerpt, "probe response");
                classify(&text)
            }
            Ok(Err(e)) => {
                debug!(identifier, route = %route, error = %e, "probe transport failure");
                ProbeOutcome::TransportError
            }
            Err(_) => {
                debug!(identifier, route = %route, "probe timed out");
                ProbeOutcome::TransportError
            }
        }
    }
}
