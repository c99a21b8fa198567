//! Session-based leader election on top of Consul.
//!
//! Every node runs the same single-shot round: read the election key, and if
//! no live session holds it, create a session bound to the node's health
//! checks and try to acquire the key with it. The node whose session holds
//! the key is the leader. Nodes never talk to each other; mutual exclusion
//! comes entirely from the coordination service's atomic acquire and its
//! session lock-delay.
//!
//! # Overview
//!
//! - **Single pass**: [`LeaderElection::run`] decides Leader, Follower or Error once
//! - **Seated leaders are recognized**: a node already holding the key is not re-contested
//! - **No leaked sessions**: a session that lost the race is destroyed again
//! - **Role tags**: the role can be published as a tag on a registered service
//!
//! # Example
//!
//! ```ignore
//! use consul_leader_election::{ConsulClient, ElectionConfig, LeaderElection};
//!
//! let config = ElectionConfig::new("service/redis/leader")
//!     .with_health_check("service:redis")
//!     .with_service_name("redis")
//!     .with_leader_tag("master")
//!     .with_follower_tag("replica");
//!
//! let election = LeaderElection::new(ConsulClient::from_env()?, config)?;
//! let outcome = election.run().await;
//! std::process::exit(outcome.exit_code(&election.config().exit_codes()));
//! ```

mod client;
mod config;
mod consul;
mod election;
mod error;
mod lock;
mod memory;
mod resolver;
mod session;
mod tags;

pub use client::{
    CoordinationClient, KeyRecord, ServiceRegistration, SessionId, SessionInfo, SessionRequest,
};
pub use config::{ElectionConfig, ExitCodes, BASELINE_HEALTH_CHECK, DEFAULT_LOCK_DELAY};
pub use consul::{ConsulClient, ConsulConfig, DEFAULT_CONSUL_ADDR, ENV_PREFIX};
pub use election::{ElectionOutcome, LeaderElection, Role};
pub use error::{ClientError, ClientResult, ElectionError, Result};
pub use lock::LockAcquirer;
pub use memory::{InMemoryCoordinator, Operation};
pub use resolver::{CurrentLeader, LeadershipResolver};
pub use session::SessionController;
pub use tags::{RoleTagSynchronizer, RoleTags, TagSync};
