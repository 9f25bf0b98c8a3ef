use crate::index::ByteRange;
use cellscope_base::{err_kind, Error, ErrorKind, Result};
use reqwest::{header::RANGE, Client, StatusCode};
use std::{future::Future, time::Duration};
use tracing::debug;

pub trait Transport: Send + Sync + 'static {
    /// Fetch the object at `url`, or only the inclusive byte `range` of it.
    /// Any failure to produce the requested bytes is an `ErrorKind::Fetch`.
    fn get(
        &self,
        url: &str,
        range: Option<ByteRange>,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Requests exceeding this fail; nothing is retried at this layer.
    pub request_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            request_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
            user_agent: format!("cellscope/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub const TIMEOUT_VAR: &'static str = "CELLSCOPE_HTTP_TIMEOUT_SECS";
    pub const USER_AGENT_VAR: &'static str = "CELLSCOPE_USER_AGENT";

    // Defaults, overridden by whichever of the variables above are set.
    pub fn from_env() -> Result<Self> {
        let mut config = HttpConfig::default();
        if let Ok(secs) = std::env::var(Self::TIMEOUT_VAR) {
            let secs: u64 = secs.trim().parse()?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(agent) = std::env::var(Self::USER_AGENT_VAR) {
            config.user_agent = agent;
        }
        Ok(config)
    }
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_nodelay(true)
            .build()?;
        Ok(HttpTransport { client })
    }
}

fn fetch_err(e: reqwest::Error) -> Error {
    Error::new(ErrorKind::Fetch, e)
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(r) = range {
            request = request.header(RANGE, r.header_value());
        }
        let response = request.send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(err_kind(
                ErrorKind::Fetch,
                format!("GET {}: status {}", url, status),
            ));
        }
        let bytes = response.bytes().await.map_err(fetch_err)?;
        debug!(url, ?range, %status, len = bytes.len(), "fetched");
        match range {
            // A server that ignores Range answers 200 with the whole object.
            Some(r) if status != StatusCode::PARTIAL_CONTENT => Ok(r.slice(&bytes)?.to_vec()),
            _ => Ok(bytes.to_vec()),
        }
    }
}
