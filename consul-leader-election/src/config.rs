//! Election configuration

use std::time::Duration;

use crate::election::Role;
use crate::error::{ElectionError, Result};
use crate::tags::RoleTags;

/// Health check every session is bound to
pub const BASELINE_HEALTH_CHECK: &str = "serfHealth";

/// Default lock-delay applied to new sessions
pub const DEFAULT_LOCK_DELAY: Duration = Duration::from_secs(1);

/// Process exit codes for each election outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes {
    pub leader: i32,
    pub follower: i32,
    pub error: i32,
}

impl Default for ExitCodes {
    fn default() -> Self {
        Self {
            leader: 0,
            follower: 1,
            error: 2,
        }
    }
}

impl ExitCodes {
    /// Exit code for a decided role
    pub fn for_role(&self, role: Role) -> i32 {
        match role {
            Role::Leader => self.leader,
            Role::Follower => self.follower,
        }
    }
}

/// Immutable configuration for one election run.
///
/// # Example
///
/// ```
/// use consul_leader_election::ElectionConfig;
/// use std::time::Duration;
///
/// let config = ElectionConfig::new("service/redis/leader")
///     .with_lock_delay(Duration::from_secs(5))
///     .with_health_check("service:redis")
///     .with_service_name("redis")
///     .with_leader_tag("master")
///     .with_follower_tag("replica");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.session_name(), "service/redis/leader");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionConfig {
    key: String,
    key_value: Option<String>,
    session_name: Option<String>,
    lock_delay: Duration,
    health_checks: Vec<String>,
    service_name: Option<String>,
    leader_tag: Option<String>,
    follower_tag: Option<String>,
    exit_codes: ExitCodes,
}

/// Treat empty strings as "not set"
fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl ElectionConfig {
    /// Create a configuration contesting `key` with all defaults
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            key_value: None,
            session_name: None,
            lock_delay: DEFAULT_LOCK_DELAY,
            health_checks: Vec::new(),
            service_name: None,
            leader_tag: None,
            follower_tag: None,
            exit_codes: ExitCodes::default(),
        }
    }

    /// Value written to the key on acquisition (default: local node name)
    pub fn with_key_value(mut self, value: impl Into<String>) -> Self {
        self.key_value = non_empty(value);
        self
    }

    /// Session name (default: the key)
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = non_empty(name);
        self
    }

    pub fn with_lock_delay(mut self, lock_delay: Duration) -> Self {
        self.lock_delay = lock_delay;
        self
    }

    /// Add a health check on top of the baseline check
    pub fn with_health_check(mut self, check: impl Into<String>) -> Self {
        self.health_checks.push(check.into());
        self
    }

    pub fn with_health_checks<I, S>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.health_checks.extend(checks.into_iter().map(Into::into));
        self
    }

    /// Service whose tags reflect the role
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = non_empty(name);
        self
    }

    pub fn with_leader_tag(mut self, tag: impl Into<String>) -> Self {
        self.leader_tag = non_empty(tag);
        self
    }

    pub fn with_follower_tag(mut self, tag: impl Into<String>) -> Self {
        self.follower_tag = non_empty(tag);
        self
    }

    pub fn with_exit_codes(mut self, exit_codes: ExitCodes) -> Self {
        self.exit_codes = exit_codes;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn key_value(&self) -> Option<&str> {
        self.key_value.as_deref()
    }

    pub fn session_name(&self) -> &str {
        self.session_name.as_deref().unwrap_or(&self.key)
    }

    pub fn lock_delay(&self) -> Duration {
        self.lock_delay
    }

    /// Checks the session is bound to: the baseline check followed by the
    /// configured extras, duplicates kept
    pub fn session_checks(&self) -> Vec<String> {
        std::iter::once(BASELINE_HEALTH_CHECK.to_string())
            .chain(self.health_checks.iter().cloned())
            .collect()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// The role tags to publish, when tagging is enabled
    pub fn role_tags(&self) -> RoleTags {
        RoleTags::new(self.leader_tag.clone(), self.follower_tag.clone())
    }

    pub fn exit_codes(&self) -> ExitCodes {
        self.exit_codes
    }

    /// Reject inconsistent configurations before any election logic runs
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(ElectionError::configuration("argument --key is not set"));
        }
        if self.key.trim_start_matches('/').is_empty() {
            return Err(ElectionError::configuration(format!(
                "argument --key '{}' does not name a key",
                self.key
            )));
        }

        if self.service_name.is_none() {
            if self.leader_tag.is_some() {
                return Err(ElectionError::configuration(
                    "argument --service-name is not set (required if you set --leader-tag)",
                ));
            }
            if self.follower_tag.is_some() {
                return Err(ElectionError::configuration(
                    "argument --service-name is not set (required if you set --not-leader-tag)",
                ));
            }
        }

        if let Some(service) = &self.service_name {
            if self.leader_tag.is_none() && self.follower_tag.is_none() {
                return Err(ElectionError::configuration(format!(
                    "'--service-name {}' has no effect without setting --leader-tag or --not-leader-tag",
                    service
                )));
            }
        }

        if self.leader_tag.is_some() && self.leader_tag == self.follower_tag {
            return Err(ElectionError::configuration(
                "--leader-tag and --not-leader-tag must differ",
            ));
        }

        Ok(())
    }
}
