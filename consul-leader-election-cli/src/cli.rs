//! CLI definition for consul-leader-election.
//!
//! This module only depends on `clap` and `std` so that `build.rs` can compile
//! it on its own via `#[path = "src/cli.rs"]` to render the man page and
//! shell completions.

use std::time::Duration;

use clap::Parser;

/// Parse a lock-delay given in (possibly fractional) seconds
pub fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("'{}' is not a valid duration", value))
}

/// Decide whether this node is the leader for a key, publish the role as a
/// service tag and report it through the exit code.
///
/// Run it periodically (cron, systemd timer, health check script). Each run
/// is a single decision; retries belong to whatever invokes it.
#[derive(Parser, Debug)]
#[command(name = "consul-leader-election")]
#[command(version)]
#[command(about = "Leader election through Consul sessions")]
pub struct Cli {
    /// KV key to contend for (required)
    #[arg(long)]
    pub key: Option<String>,

    /// Value written to the key when it is acquired (default: Consul node name)
    #[arg(long)]
    pub key_value: Option<String>,

    /// Name of the session (default: the key)
    #[arg(long)]
    pub session_name: Option<String>,

    /// Lock-delay in seconds applied when the session is invalidated
    #[arg(long, value_parser = parse_seconds, default_value = "1")]
    pub lock_delay: Duration,

    /// Additional health check bound to the session, e.g. service:redis
    /// (serfHealth is always included)
    #[arg(long = "health-check", value_name = "CHECK")]
    pub health_checks: Vec<String>,

    /// Service whose tags reflect the role
    #[arg(long)]
    pub service_name: Option<String>,

    /// Tag set on the service while this node is the leader
    #[arg(long)]
    pub leader_tag: Option<String>,

    /// Tag set on the service while this node is not the leader
    #[arg(long, visible_alias = "follower-tag")]
    pub not_leader_tag: Option<String>,

    /// Exit code when this node is the leader
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub leader_exit_code: i32,

    /// Exit code when another node is the leader
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub not_leader_exit_code: i32,

    /// Exit code when the election could not be decided
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    pub error_exit_code: i32,

    /// Consul agent address (overrides CONSUL_HTTP_ADDR)
    #[arg(long)]
    pub consul_addr: Option<String>,

    /// Consul ACL token (overrides CONSUL_HTTP_TOKEN)
    #[arg(long)]
    pub consul_token: Option<String>,

    /// Enable debug output to stderr
    #[arg(short, long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["consul-leader-election", "--key", "leader"]);
        assert_eq!(cli.key.as_deref(), Some("leader"));
        assert_eq!(cli.lock_delay, Duration::from_secs(1));
        assert!(cli.health_checks.is_empty());
        assert_eq!(cli.leader_exit_code, 0);
        assert_eq!(cli.not_leader_exit_code, 1);
        assert_eq!(cli.error_exit_code, 2);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_parsing_without_key() {
        let cli = Cli::parse_from(["consul-leader-election"]);
        assert!(cli.key.is_none());
    }

    #[test]
    fn test_cli_parsing_repeated_health_checks() {
        let cli = Cli::parse_from([
            "consul-leader-election",
            "--key",
            "leader",
            "--health-check",
            "service:redis",
            "--health-check",
            "service:sentinel",
        ]);
        assert_eq!(cli.health_checks, vec!["service:redis", "service:sentinel"]);
    }

    #[test]
    fn test_cli_parsing_follower_alias() {
        let cli = Cli::parse_from([
            "consul-leader-election",
            "--key",
            "leader",
            "--follower-tag",
            "replica",
        ]);
        assert_eq!(cli.not_leader_tag.as_deref(), Some("replica"));
    }

    #[test]
    fn test_cli_parsing_exit_codes() {
        let cli = Cli::parse_from([
            "consul-leader-election",
            "--leader-exit-code",
            "10",
            "--not-leader-exit-code",
            "-1",
            "--error-exit-code",
            "3",
        ]);
        assert_eq!(cli.leader_exit_code, 10);
        assert_eq!(cli.not_leader_exit_code, -1);
        assert_eq!(cli.error_exit_code, 3);
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_seconds("0.25").unwrap(), Duration::from_millis(250));
        assert!(parse_seconds("soon").is_err());
        assert!(parse_seconds("-1").is_err());
    }
}
