//! Atomic acquisition of the election key

use tracing::debug;

use crate::client::CoordinationClient;
use crate::error::{ElectionError, Result};

/// Attempts to take the election key with a session
pub struct LockAcquirer<'a, C: CoordinationClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: CoordinationClient + ?Sized> LockAcquirer<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Try to acquire `key` for `session`, writing `value` on success.
    ///
    /// `Ok(false)` means another session holds the key this round. It is
    /// reported as-is and never retried.
    pub async fn acquire(&self, key: &str, value: &str, session: &str) -> Result<bool> {
        let acquired = self
            .client
            .acquire_key(key, value.as_bytes(), session)
            .await
            .map_err(|e| ElectionError::coordination("kv acquire", e))?;

        debug!(key, session, acquired, "acquire attempt");
        Ok(acquired)
    }
}
