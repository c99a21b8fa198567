//! One election round.
//!
//! ```text
//! Start ── kv get ──┬─ held by a live session ── owner == local node? ── Leader / Follower
//!                   └─ free or stale ── create session ── acquire ──┬─ true  ── Leader
//!                                                                   └─ false ── destroy session ── Follower
//! ```
//!
//! Any failed coordination call ends the round in the Error outcome. A decided
//! role is published through the role tag before the round completes.

use std::fmt;

use tracing::{debug, info, warn};

use crate::client::CoordinationClient;
use crate::config::{ElectionConfig, ExitCodes};
use crate::error::{ElectionError, Result};
use crate::lock::LockAcquirer;
use crate::resolver::{CurrentLeader, LeadershipResolver};
use crate::session::SessionController;
use crate::tags::{RoleTagSynchronizer, RoleTags};

/// Role of the local node after an election round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Leader => write!(f, "leader"),
            Role::Follower => write!(f, "follower"),
        }
    }
}

/// Terminal state of an election round
#[derive(Debug)]
pub enum ElectionOutcome {
    Leader,
    Follower,
    Error(ElectionError),
}

impl ElectionOutcome {
    /// The decided role, if the round did not fail
    pub fn role(&self) -> Option<Role> {
        match self {
            ElectionOutcome::Leader => Some(Role::Leader),
            ElectionOutcome::Follower => Some(Role::Follower),
            ElectionOutcome::Error(_) => None,
        }
    }

    pub fn is_leader(&self) -> bool {
        matches!(self, ElectionOutcome::Leader)
    }

    pub fn is_follower(&self) -> bool {
        matches!(self, ElectionOutcome::Follower)
    }

    pub fn error(&self) -> Option<&ElectionError> {
        match self {
            ElectionOutcome::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self, codes: &ExitCodes) -> i32 {
        match self.role() {
            Some(role) => codes.for_role(role),
            None => codes.error,
        }
    }
}

impl From<Result<Role>> for ElectionOutcome {
    fn from(result: Result<Role>) -> Self {
        match result {
            Ok(Role::Leader) => ElectionOutcome::Leader,
            Ok(Role::Follower) => ElectionOutcome::Follower,
            Err(e) => ElectionOutcome::Error(e),
        }
    }
}

/// Runs election rounds for one key against a coordination service.
///
/// # Example
///
/// ```
/// use consul_leader_election::{ElectionConfig, InMemoryCoordinator, LeaderElection};
///
/// # tokio_test::block_on(async {
/// let client = InMemoryCoordinator::new("node-a");
/// let election = LeaderElection::new(client, ElectionConfig::new("service/leader")).unwrap();
///
/// let outcome = election.run().await;
/// assert!(outcome.is_leader());
/// assert_eq!(outcome.exit_code(&election.config().exit_codes()), 0);
/// # });
/// ```
pub struct LeaderElection<C: CoordinationClient> {
    client: C,
    config: ElectionConfig,
    tags: RoleTags,
}

impl<C: CoordinationClient> LeaderElection<C> {
    /// Create an election, rejecting an invalid configuration up front
    pub fn new(client: C, config: ElectionConfig) -> Result<Self> {
        config.validate()?;
        let tags = config.role_tags();
        Ok(Self {
            client,
            config,
            tags,
        })
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one round and map it to its terminal outcome
    pub async fn run(&self) -> ElectionOutcome {
        let outcome = ElectionOutcome::from(self.elect().await);
        if let ElectionOutcome::Error(e) = &outcome {
            debug!(key = self.config.key(), error = %e, "election failed");
        }
        outcome
    }

    /// Decide the role of the local node and publish it as a tag
    pub async fn elect(&self) -> Result<Role> {
        let local_node = self
            .client
            .local_node_name()
            .await
            .map_err(|e| ElectionError::coordination("agent self", e))?;

        let role = self.decide(&local_node).await?;

        RoleTagSynchronizer::new(&self.client, &self.tags)
            .sync_role(self.config.service_name(), role)
            .await?;

        Ok(role)
    }

    async fn decide(&self, local_node: &str) -> Result<Role> {
        let current = LeadershipResolver::new(&self.client)
            .resolve_current_leader(self.config.key())
            .await?;

        match current {
            CurrentLeader::HeldBy { node, .. } if node == local_node => {
                info!("I am the current leader.");
                Ok(Role::Leader)
            }
            CurrentLeader::HeldBy { node, .. } => {
                info!("{} is the current leader.", node);
                Ok(Role::Follower)
            }
            CurrentLeader::None => self.contest(local_node).await,
        }
    }

    /// Create a session and race for the key with it
    async fn contest(&self, local_node: &str) -> Result<Role> {
        let sessions = SessionController::new(&self.client);
        let session = sessions
            .create(
                self.config.session_name(),
                self.config.session_checks(),
                self.config.lock_delay(),
            )
            .await?;

        let value = self.config.key_value().unwrap_or(local_node);
        let acquired = LockAcquirer::new(&self.client)
            .acquire(self.config.key(), value, &session)
            .await;

        match acquired {
            Ok(true) => {
                info!("I'm the current leader.");
                Ok(Role::Leader)
            }
            Ok(false) => {
                sessions.destroy(&session).await?;
                info!("Failed to acquire key.");
                Ok(Role::Follower)
            }
            Err(e) => {
                if let Err(cleanup) = sessions.destroy(&session).await {
                    warn!(session = %session, error = %cleanup, "failed to destroy unused session");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ServiceRegistration;
    use crate::memory::{InMemoryCoordinator, Operation};

    fn redis(tags: &[&str]) -> ServiceRegistration {
        ServiceRegistration {
            id: "redis".to_string(),
            name: "redis".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            port: 6379,
            address: String::new(),
            enable_tag_override: false,
        }
    }

    fn tagged_config() -> ElectionConfig {
        ElectionConfig::new("leader")
            .with_service_name("redis")
            .with_leader_tag("master")
            .with_follower_tag("replica")
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let client = InMemoryCoordinator::new("node-a");
        let result = LeaderElection::new(client, ElectionConfig::new(""));
        assert!(matches!(result, Err(ElectionError::Configuration { .. })));
    }

    #[test]
    fn test_outcome_exit_codes() {
        let codes = ExitCodes::default();
        assert_eq!(ElectionOutcome::Leader.exit_code(&codes), 0);
        assert_eq!(ElectionOutcome::Follower.exit_code(&codes), 1);
        let error = ElectionOutcome::Error(ElectionError::ServiceNotFound {
            service: "redis".to_string(),
        });
        assert_eq!(error.exit_code(&codes), 2);
        assert!(error.role().is_none());
        assert!(error.error().is_some());
    }

    #[tokio::test]
    async fn test_key_value_defaults_to_node_name() {
        let election =
            LeaderElection::new(InMemoryCoordinator::new("node-a"), ElectionConfig::new("leader"))
                .unwrap();

        assert!(election.run().await.is_leader());
        assert_eq!(
            election.client().key("leader").unwrap().value,
            b"node-a".to_vec()
        );
    }

    #[tokio::test]
    async fn test_custom_key_value_and_session_name() {
        let config = ElectionConfig::new("leader")
            .with_key_value("10.0.0.1:6379")
            .with_session_name("redis-election")
            .with_health_check("service:redis");
        let election = LeaderElection::new(InMemoryCoordinator::new("node-a"), config).unwrap();

        assert!(election.run().await.is_leader());

        let client = election.client();
        let record = client.key("leader").unwrap();
        assert_eq!(record.value, b"10.0.0.1:6379".to_vec());
        let request = client.session_request(record.holder().unwrap()).unwrap();
        assert_eq!(request.name, "redis-election");
        assert_eq!(request.checks, vec!["serfHealth", "service:redis"]);
    }

    #[tokio::test]
    async fn test_seated_leader_is_not_recontested() {
        let client = InMemoryCoordinator::new("node-a").with_key_held_by("leader", "node-a");
        let election = LeaderElection::new(client, ElectionConfig::new("leader")).unwrap();

        assert!(election.run().await.is_leader());
        assert_eq!(election.client().calls(Operation::CreateSession), 0);
        assert_eq!(election.client().calls(Operation::AcquireKey), 0);
    }

    #[tokio::test]
    async fn test_stale_holder_is_recontested() {
        let client = InMemoryCoordinator::new("node-a").with_stale_holder("leader", "expired");
        let election = LeaderElection::new(client, ElectionConfig::new("leader")).unwrap();

        assert!(election.run().await.is_leader());
        assert_eq!(election.client().calls(Operation::CreateSession), 1);
    }

    #[tokio::test]
    async fn test_acquire_error_destroys_session() {
        let client = InMemoryCoordinator::new("node-a").fail_on(Operation::AcquireKey);
        let election = LeaderElection::new(client, ElectionConfig::new("leader")).unwrap();

        let outcome = election.run().await;
        assert!(matches!(
            outcome.error(),
            Some(ElectionError::Coordination {
                operation: "kv acquire",
                ..
            })
        ));
        assert!(election.client().sessions_of("node-a").is_empty());
    }

    #[tokio::test]
    async fn test_failed_cleanup_after_lost_race_is_error() {
        let client = InMemoryCoordinator::new("node-a")
            .with_rival("node-b")
            .fail_on(Operation::DestroySession);
        let election = LeaderElection::new(client, ElectionConfig::new("leader")).unwrap();

        let outcome = election.run().await;
        assert!(matches!(
            outcome.error(),
            Some(ElectionError::Coordination {
                operation: "session destroy",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_follower_tag_replaces_leader_tag() {
        let client = InMemoryCoordinator::new("node-a")
            .with_key_held_by("leader", "node-b")
            .with_service(redis(&["master"]));
        let election = LeaderElection::new(client, tagged_config()).unwrap();

        assert!(election.run().await.is_follower());
        assert_eq!(
            election.client().service("redis").unwrap().tags,
            vec!["replica"]
        );
    }

    #[tokio::test]
    async fn test_unconfigured_role_tag_strips_roles() {
        let config = ElectionConfig::new("leader")
            .with_service_name("redis")
            .with_leader_tag("master");
        let client = InMemoryCoordinator::new("node-a")
            .with_key_held_by("leader", "node-b")
            .with_service(redis(&["v1", "master"]));
        let election = LeaderElection::new(client, config).unwrap();

        assert!(election.run().await.is_follower());
        assert_eq!(election.client().service("redis").unwrap().tags, vec!["v1"]);
    }

    #[tokio::test]
    async fn test_repeated_rounds_are_stable() {
        let client = InMemoryCoordinator::new("node-a").with_service(redis(&[]));
        let election = LeaderElection::new(client, tagged_config()).unwrap();

        assert!(election.run().await.is_leader());
        assert!(election.run().await.is_leader());

        let client = election.client();
        assert_eq!(client.calls(Operation::CreateSession), 1);
        assert_eq!(client.calls(Operation::RegisterService), 1);
        assert_eq!(client.sessions_of("node-a").len(), 1);
    }
}
