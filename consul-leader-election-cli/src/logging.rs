//! Log setup for the binary

use tracing_subscriber::EnvFilter;

/// Filter used by `--debug`
pub const DEBUG_FILTER: &str = "consul_leader_election=debug,consul_leader_election_cli=debug";

/// Filter applied when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Pick the log filter: `--debug` wins over `RUST_LOG`
pub fn filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the stderr subscriber; stdout stays free for callers
pub fn init(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}
