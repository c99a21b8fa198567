//! consul-leader-election command-line interface.
//!
//! Exit codes (defaults, each configurable):
//! - 0: this node is the leader
//! - 1: another node is the leader
//! - 2: the election failed or the arguments are invalid

pub mod cli;
pub mod logging;

pub use cli::Cli;

use consul_leader_election::{
    ConsulClient, ConsulConfig, ElectionConfig, ElectionError, ExitCodes, LeaderElection, Result,
};
use tracing::{error, info};

impl Cli {
    pub fn exit_codes(&self) -> ExitCodes {
        ExitCodes {
            leader: self.leader_exit_code,
            follower: self.not_leader_exit_code,
            error: self.error_exit_code,
        }
    }

    /// Election settings taken from the command line
    pub fn election_config(&self) -> ElectionConfig {
        let mut config = ElectionConfig::new(self.key.clone().unwrap_or_default())
            .with_lock_delay(self.lock_delay)
            .with_health_checks(self.health_checks.iter().cloned())
            .with_exit_codes(self.exit_codes());

        if let Some(value) = &self.key_value {
            config = config.with_key_value(value.as_str());
        }
        if let Some(name) = &self.session_name {
            config = config.with_session_name(name.as_str());
        }
        if let Some(service) = &self.service_name {
            config = config.with_service_name(service.as_str());
        }
        if let Some(tag) = &self.leader_tag {
            config = config.with_leader_tag(tag.as_str());
        }
        if let Some(tag) = &self.not_leader_tag {
            config = config.with_follower_tag(tag.as_str());
        }
        config
    }

    /// Consul settings from the environment, with command-line overrides
    pub fn consul_config(&self) -> Result<ConsulConfig> {
        let mut config = ConsulConfig::load()?;
        if let Some(addr) = &self.consul_addr {
            config = config.with_addr(addr.as_str());
        }
        if let Some(token) = &self.consul_token {
            config = config.with_token(token.as_str());
        }
        Ok(config)
    }
}

/// Build the election from the command line without touching the network
pub fn prepare(cli: &Cli) -> Result<LeaderElection<ConsulClient>> {
    let config = cli.election_config();
    config.validate()?;
    let client = ConsulClient::new(&cli.consul_config()?)?;
    LeaderElection::new(client, config)
}

/// Run one election round and return the process exit code
pub async fn run(cli: &Cli) -> i32 {
    let codes = cli.exit_codes();

    let election = match prepare(cli) {
        Ok(election) => election,
        Err(e) => {
            report(&e);
            return codes.error;
        }
    };

    let outcome = election.run().await;
    match (outcome.role(), outcome.error()) {
        (Some(role), _) => info!(key = election.config().key(), %role, "election decided"),
        (None, Some(e)) => report(e),
        (None, None) => {}
    }
    outcome.exit_code(&codes)
}

fn report(error: &ElectionError) {
    error!("{}", error);
}
