//! Ephemeral sessions backing the election key

use std::time::Duration;

use tracing::debug;

use crate::client::{CoordinationClient, SessionId, SessionRequest};
use crate::error::{ElectionError, Result};

/// Creates and destroys sessions on behalf of the local node
pub struct SessionController<'a, C: CoordinationClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: CoordinationClient + ?Sized> SessionController<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Create a session bound to `checks` with the given lock-delay.
    ///
    /// Failure is fatal for the current election; no retry is attempted.
    pub async fn create(
        &self,
        name: &str,
        checks: Vec<String>,
        lock_delay: Duration,
    ) -> Result<SessionId> {
        let request = SessionRequest {
            name: name.to_string(),
            checks,
            lock_delay,
        };

        let id = self
            .client
            .create_session(&request)
            .await
            .map_err(|e| ElectionError::coordination("session create", e))?;

        debug!(session = %id, name, checks = ?request.checks, ?lock_delay, "created session");
        Ok(id)
    }

    /// Destroy a session this node created
    pub async fn destroy(&self, id: &str) -> Result<()> {
        self.client
            .destroy_session(id)
            .await
            .map_err(|e| ElectionError::coordination("session destroy", e))?;

        debug!(session = %id, "destroyed session");
        Ok(())
    }
}
