//! Consul HTTP API payloads

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::client::{KeyRecord, ServiceRegistration, SessionInfo, SessionRequest};
use crate::error::{ClientError, ClientResult};

/// Entry returned by `GET /v1/kv/<key>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct KvEntry {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

impl KvEntry {
    pub fn into_record(self) -> ClientResult<KeyRecord> {
        let value = match self.value {
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| ClientError::InvalidResponse(format!("kv value: {}", e)))?,
            None => Vec::new(),
        };
        Ok(KeyRecord {
            key: self.key,
            value,
            session: self.session,
        })
    }
}

/// Go duration string understood by Consul, without losing sub-millisecond parts
fn go_duration(duration: Duration) -> String {
    if duration.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}ns", duration.as_nanos())
    }
}

/// Body of `PUT /v1/session/create`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SessionCreate<'a> {
    pub name: &'a str,
    pub checks: &'a [String],
    pub lock_delay: String,
}

impl<'a> From<&'a SessionRequest> for SessionCreate<'a> {
    fn from(request: &'a SessionRequest) -> Self {
        Self {
            name: &request.name,
            checks: &request.checks,
            lock_delay: go_duration(request.lock_delay),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionCreated {
    #[serde(rename = "ID")]
    pub id: String,
}

/// Element of `GET /v1/session/info/<id>`
#[derive(Debug, Deserialize)]
pub(crate) struct SessionEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Node")]
    pub node: String,
}

impl From<SessionEntry> for SessionInfo {
    fn from(entry: SessionEntry) -> Self {
        SessionInfo {
            id: entry.id,
            node: entry.node,
        }
    }
}

/// The parts of `GET /v1/agent/self` we read
#[derive(Debug, Deserialize)]
pub(crate) struct AgentSelf {
    #[serde(rename = "Config")]
    pub config: AgentConfig,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgentConfig {
    #[serde(rename = "NodeName")]
    pub node_name: String,
}

/// Value of the `GET /v1/agent/services` map
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub enable_tag_override: bool,
}

impl From<AgentService> for ServiceRegistration {
    fn from(service: AgentService) -> Self {
        ServiceRegistration {
            id: service.id,
            name: service.service,
            tags: service.tags.unwrap_or_default(),
            port: service.port,
            address: service.address,
            enable_tag_override: service.enable_tag_override,
        }
    }
}
