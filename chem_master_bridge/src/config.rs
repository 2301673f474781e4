use crate::error::BridgeError;
use crate::protocol::{INBOUND_CAP, OUTBOUND_CAP};
use std::time::Duration;
use url::Url;

pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:9101";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9101";
pub const WS_URL_ENV: &str = "CHEM_MASTER_WS_URL";
pub const LISTEN_ADDR_ENV: &str = "CHEM_MASTER_WS_ADDR";

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(30);
const DEFAULT_RECONNECT_SECS: [u64; 4] = [1, 2, 5, 10];

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub ws_url: String,
    pub inbound_cap: usize,
    pub outbound_cap: usize,
    /// Socket read timeout; bounds how long the network thread waits before
    /// draining queued actions again.
    pub read_timeout: Duration,
    pub reconnect_delays: Vec<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            inbound_cap: INBOUND_CAP,
            outbound_cap: OUTBOUND_CAP,
            read_timeout: DEFAULT_READ_TIMEOUT,
            reconnect_delays: DEFAULT_RECONNECT_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(WS_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                config.ws_url = url.to_string();
            }
        }
        config
    }

    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Inbound and outbound queue capacities, never below one: a
    /// zero-capacity channel rejects every `try_send`.
    pub fn queue_caps(&self) -> (usize, usize) {
        (self.inbound_cap.max(1), self.outbound_cap.max(1))
    }

    pub fn parsed_url(&self) -> Result<Url, BridgeError> {
        let invalid = |reason: String| BridgeError::InvalidUrl {
            url: self.ws_url.clone(),
            reason,
        };
        let url = Url::parse(&self.ws_url).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "ws" {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(url)
    }
}
