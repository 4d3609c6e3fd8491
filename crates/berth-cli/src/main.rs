//! # berth — mount resolution CLI
//!
//! Operator entry points over the Berth volume layer: parse mount specs,
//! call volume plugins, migrate legacy container records, and resolve a
//! container's mount table.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
