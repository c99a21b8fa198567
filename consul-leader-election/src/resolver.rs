//! Finding out who currently holds the election key

use tracing::{debug, warn};

use crate::client::CoordinationClient;
use crate::error::{ElectionError, Result};

/// Who holds the election key right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentLeader {
    /// Nobody: the key is absent, unheld, or its session has expired
    None,
    /// A live session created by `node` holds the key
    HeldBy { node: String, session: String },
}

impl CurrentLeader {
    /// Whether the key is held by a session of `node`
    pub fn is_node(&self, node: &str) -> bool {
        matches!(self, CurrentLeader::HeldBy { node: holder, .. } if holder == node)
    }
}

/// Resolves the current holder of the election key
pub struct LeadershipResolver<'a, C: CoordinationClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: CoordinationClient + ?Sized> LeadershipResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Read `key` and look up the node behind its session.
    ///
    /// A session that disappears between the key read and the lookup is
    /// treated as no leader.
    pub async fn resolve_current_leader(&self, key: &str) -> Result<CurrentLeader> {
        let record = self
            .client
            .get_key(key)
            .await
            .map_err(|e| ElectionError::coordination("kv get", e))?;

        let Some(session) = record.as_ref().and_then(|r| r.holder()) else {
            debug!(key, "key has no holder");
            return Ok(CurrentLeader::None);
        };

        let info = self
            .client
            .session_info(session)
            .await
            .map_err(|e| ElectionError::coordination("session info", e))?;

        match info {
            Some(info) => Ok(CurrentLeader::HeldBy {
                node: info.node,
                session: info.id,
            }),
            None => {
                warn!(key, session, "key references an expired session");
                Ok(CurrentLeader::None)
            }
        }
    }
}
