//! The coordination service as seen by the election.
//!
//! [`CoordinationClient`] is the only seam between the election logic and the
//! outside world. [`ConsulClient`](crate::ConsulClient) talks to a Consul agent
//! over HTTP; [`InMemoryCoordinator`](crate::InMemoryCoordinator) keeps the
//! same state in process.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

/// Opaque session identifier assigned by the coordination service
pub type SessionId = String;

/// Current state of an election key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub key: String,
    pub value: Vec<u8>,
    /// Session currently holding the key, if any
    pub session: Option<SessionId>,
}

impl KeyRecord {
    /// The attached session, ignoring empty identifiers
    pub fn holder(&self) -> Option<&str> {
        self.session.as_deref().filter(|id| !id.is_empty())
    }
}

/// Parameters for a new ephemeral session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub name: String,
    pub checks: Vec<String>,
    pub lock_delay: Duration,
}

/// What the coordination service knows about a live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    /// Node that created the session
    pub node: String,
}

/// A service registered with the local agent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub enable_tag_override: bool,
}

/// Operations the election needs from the coordination service.
///
/// Implementations must not retry: every error is reported to the caller
/// as-is and the election aborts.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Read a key; `None` when the key does not exist
    async fn get_key(&self, key: &str) -> ClientResult<Option<KeyRecord>>;

    /// Create an ephemeral session owned by the local node
    async fn create_session(&self, request: &SessionRequest) -> ClientResult<SessionId>;

    /// Destroy a session, releasing anything it holds
    async fn destroy_session(&self, id: &str) -> ClientResult<()>;

    /// Look up a session; `None` when it no longer exists
    async fn session_info(&self, id: &str) -> ClientResult<Option<SessionInfo>>;

    /// Atomically acquire `key` for `session`, returning whether it succeeded
    async fn acquire_key(&self, key: &str, value: &[u8], session: &str) -> ClientResult<bool>;

    /// Name of the node this process runs on
    async fn local_node_name(&self) -> ClientResult<String>;

    /// All services registered with the local agent, keyed by service ID
    async fn services(&self) -> ClientResult<HashMap<String, ServiceRegistration>>;

    /// Register (or re-register) a service
    async fn register_service(&self, registration: &ServiceRegistration) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_record_holder() {
        let mut record = KeyRecord {
            key: "service/leader".to_string(),
            value: b"node-a".to_vec(),
            session: None,
        };
        assert_eq!(record.holder(), None);

        record.session = Some(String::new());
        assert_eq!(record.holder(), None);

        record.session = Some("abc".to_string());
        assert_eq!(record.holder(), Some("abc"));
    }

    #[test]
    fn test_service_registration_wire_format() {
        let registration = ServiceRegistration {
            id: "redis-1".to_string(),
            name: "redis".to_string(),
            tags: vec!["master".to_string()],
            port: 6379,
            address: "10.0.0.1".to_string(),
            enable_tag_override: true,
        };

        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["ID"], "redis-1");
        assert_eq!(json["Name"], "redis");
        assert_eq!(json["Tags"][0], "master");
        assert_eq!(json["Port"], 6379);
        assert_eq!(json["Address"], "10.0.0.1");
        assert_eq!(json["EnableTagOverride"], true);
    }
}
