// Shared transport configuration for building reqwest::Client instances.
//
// Domoticz exposes a plain, unauthenticated HTTP surface, so the only
// knob that matters here is the request timeout.

use std::time::Duration;

use crate::error::Error;

/// Transport configuration for the Domoticz HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("battwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Transport)
    }
}
