//! Consul agent connection settings
//!
//! Settings come from serialized defaults overlaid with the standard Consul
//! environment variables:
//!
//! - `CONSUL_HTTP_ADDR` : agent address, `host:port` or a full `http(s)://` URL
//! - `CONSUL_HTTP_TOKEN` : ACL token
//! - `CONSUL_HTTP_SSL` : use https when the address carries no scheme
//! - `CONSUL_HTTP_TIMEOUT` : request timeout in seconds

use std::time::Duration;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ElectionError, Result};

/// Address of a Consul agent on the local host
pub const DEFAULT_CONSUL_ADDR: &str = "127.0.0.1:8500";

/// Prefix of the environment variables read by [`ConsulConfig::load`]
pub const ENV_PREFIX: &str = "CONSUL_HTTP_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsulConfig {
    pub addr: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub ssl: bool,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_CONSUL_ADDR.to_string(),
            token: None,
            ssl: false,
            timeout: None,
        }
    }
}

impl ConsulConfig {
    /// Defaults merged with `CONSUL_HTTP_*` environment variables
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load settings from the environment
    pub fn load() -> Result<Self> {
        Self::figment()
            .extract()
            .map_err(|e| ElectionError::configuration(format!("invalid Consul settings: {}", e)))
    }

    /// Override the agent address
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Override the ACL token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Base URL of the agent HTTP API
    pub fn base_url(&self) -> Result<Url> {
        let addr = self.addr.trim().trim_end_matches('/');
        let raw = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else if addr.contains("://") {
            return Err(ElectionError::configuration(format!(
                "unsupported Consul address '{}'",
                self.addr
            )));
        } else {
            let scheme = if self.ssl { "https" } else { "http" };
            format!("{}://{}", scheme, addr)
        };

        Url::parse(&raw).map_err(|e| {
            ElectionError::configuration(format!("invalid Consul address '{}': {}", self.addr, e))
        })
    }
}
