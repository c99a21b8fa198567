//! Build script for consul-leader-election-cli.
//!
//! Renders the man page and bash/zsh/fish completions from the clap derive
//! definitions in `src/cli.rs` into `OUT_DIR`.

use std::path::PathBuf;

use clap::CommandFactory;

#[path = "src/cli.rs"]
#[allow(dead_code)]
mod cli;

const BIN_NAME: &str = "consul-leader-election";

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR is not set")
    })?);
    let mut cmd = cli::Cli::command();

    let mut man = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut man)?;
    std::fs::write(out_dir.join(format!("{BIN_NAME}.1")), man)?;

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
    ] {
        clap_complete::generate_to(shell, &mut cmd, BIN_NAME, &out_dir)?;
    }

    Ok(())
}
