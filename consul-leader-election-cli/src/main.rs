//! consul-leader-election - decide and publish the leader for a Consul key.

use clap::Parser;

use consul_leader_election_cli::{logging, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let exit_code = consul_leader_election_cli::run(&cli).await;
    std::process::exit(exit_code);
}
